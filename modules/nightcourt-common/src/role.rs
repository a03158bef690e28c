use serde::{Deserialize, Serialize};

/// A hidden role. Roles travel the wire as small integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Role {
    Citizen = 1,
    Mafia = 2,
    Doctor = 3,
    Girl = 4,
    Sheriff = 5,
}

impl From<Role> for u8 {
    fn from(role: Role) -> u8 {
        role as u8
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Role::Citizen),
            2 => Ok(Role::Mafia),
            3 => Ok(Role::Doctor),
            4 => Ok(Role::Girl),
            5 => Ok(Role::Sheriff),
            other => Err(format!("unknown role tag {other}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Citizen => write!(f, "citizen"),
            Role::Mafia => write!(f, "mafia"),
            Role::Doctor => write!(f, "doctor"),
            Role::Girl => write!(f, "girl"),
            Role::Sheriff => write!(f, "sheriff"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_as_wire_integers() {
        assert_eq!(serde_json::to_value(Role::Citizen).unwrap(), 1);
        assert_eq!(serde_json::to_value(Role::Sheriff).unwrap(), 5);
    }

    #[test]
    fn unknown_role_tag_rejected() {
        assert!(serde_json::from_value::<Role>(serde_json::json!(6)).is_err());
        assert_eq!(
            serde_json::from_value::<Role>(serde_json::json!(2)).unwrap(),
            Role::Mafia
        );
    }
}
