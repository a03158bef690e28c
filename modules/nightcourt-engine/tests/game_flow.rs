//! End-to-end flows driven synchronously through the engine.
//!
//! Each seat is a player whose outbound channel the test keeps, standing in
//! for a socket. Phases are advanced either by real inbound actions or by
//! force-completing the current event and ticking, mirroring how the driver
//! task works.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use nightcourt_common::{Action, EngineError, EventName, Message, Role, Status};
use nightcourt_engine::events::{AcceptEvent, GreetCitizensEvent, MafiaEvent, NightResultEvent};
use nightcourt_engine::{
    EventStatus, Game, GameId, GameRegistry, Player, PlayerId, Session,
};

struct Seat {
    id: PlayerId,
    rx: mpsc::Receiver<Message>,
}

impl Seat {
    /// Pop the next buffered message, failing the test when there is none.
    fn recv(&mut self) -> Message {
        self.rx.try_recv().expect("expected a buffered message")
    }

    fn expect(&mut self, event: EventName, action: Action) -> Message {
        let msg = self.recv();
        assert_eq!(msg.event, event, "wrong event in {msg:?}");
        assert_eq!(msg.action, action, "wrong action in {msg:?}");
        msg
    }

    /// The most recent buffered message, discarding everything before it.
    fn last(&mut self) -> Message {
        let mut last = None;
        while let Ok(msg) = self.rx.try_recv() {
            last = Some(msg);
        }
        last.expect("expected at least one buffered message")
    }

    fn drain(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}

fn seat(game: &mut Game, name: &str) -> Seat {
    let (tx, rx) = mpsc::channel(64);
    let mut player = Player::new(tx);
    player.set_name(name);
    let id = game.players_mut().add(player);
    Seat { id, rx }
}

fn seat_with_role(game: &mut Game, name: &str, role: Role) -> Seat {
    let s = seat(game, name);
    game.players_mut()
        .get_with_out_mut(s.id)
        .unwrap()
        .set_role(role);
    s
}

fn inbound(event: EventName, action: Action, data: Value) -> Message {
    Message {
        status: None,
        iteration: 0,
        event,
        action,
        data,
    }
}

fn say(game: &mut Game, seat: &Seat, action: Action, data: Value) {
    let msg = Message {
        status: None,
        iteration: game.iteration(),
        event: game.current().name(),
        action,
        data,
    };
    game.on_message(seat.id, &msg)
        .unwrap_or_else(|err| panic!("action {action} rejected: {err}"));
}

fn try_say(game: &mut Game, seat: &Seat, action: Action, data: Value) -> Result<(), EngineError> {
    let msg = Message {
        status: None,
        iteration: game.iteration(),
        event: game.current().name(),
        action,
        data,
    };
    game.on_message(seat.id, &msg)
}

/// Force-complete the current event, advance, and process the next one.
/// Returns the name observed right after the advance.
fn force_step(game: &mut Game) -> EventName {
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    let name = game.current().name();
    game.tick();
    name
}

// ---------------------------------------------------------------------------
// Lobby
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_then_premature_start_is_rejected() {
    let registry = Arc::new(GameRegistry::new());
    let (tx, mut rx) = mpsc::channel(64);
    let mut session = Session::new(Arc::clone(&registry), tx);

    session
        .on_message(inbound(
            EventName::Game,
            Action::Create,
            json!({"username": "a"}),
        ))
        .await;

    let reply = rx.try_recv().unwrap();
    assert_eq!(reply.event, EventName::Game);
    assert_eq!(reply.action, Action::Create);
    assert_eq!(reply.status, Some(Status::Ok));
    assert_eq!(reply.data["username"], "a");
    let game_id = reply.data["game"].as_u64().unwrap() as u32;

    let roster = rx.try_recv().unwrap();
    assert_eq!(roster.action, Action::Players);
    assert_eq!(roster.data.as_array().unwrap().len(), 1);

    session
        .on_message(inbound(EventName::Game, Action::Start, Value::Null))
        .await;
    let err = rx.try_recv().unwrap();
    assert_eq!(err.status, Some(Status::Err));
    assert_eq!(err.data, json!("too few players to start game"));

    let game = registry.get(GameId(game_id)).await.unwrap();
    let game = game.lock().await;
    assert_eq!(game.current().name(), EventName::Game);
}

#[tokio::test]
async fn join_and_duplicate_username() {
    let registry = Arc::new(GameRegistry::new());

    let (tx_a, mut rx_a) = mpsc::channel(64);
    let mut master = Session::new(Arc::clone(&registry), tx_a);
    master
        .on_message(inbound(
            EventName::Game,
            Action::Create,
            json!({"username": "anton"}),
        ))
        .await;
    let game_id = rx_a.try_recv().unwrap().data["game"].as_u64().unwrap();

    let (tx_b, mut rx_b) = mpsc::channel(64);
    let mut joiner = Session::new(Arc::clone(&registry), tx_b);
    joiner
        .on_message(inbound(
            EventName::Game,
            Action::Join,
            json!({"username": "anton", "game": game_id}),
        ))
        .await;
    let rejected = rx_b.try_recv().unwrap();
    assert_eq!(rejected.status, Some(Status::Err));
    assert_eq!(rejected.data, json!("username already exists"));

    joiner
        .on_message(inbound(
            EventName::Game,
            Action::Join,
            json!({"username": "boris", "game": game_id}),
        ))
        .await;
    let accepted = rx_b.try_recv().unwrap();
    assert_eq!(accepted.status, Some(Status::Ok));
    assert_eq!(accepted.data["username"], "boris");

    // Both connections saw the updated roster.
    assert_eq!(rx_b.try_recv().unwrap().action, Action::Players);
    let roster = {
        let mut last = rx_a.try_recv().unwrap();
        while let Ok(msg) = rx_a.try_recv() {
            last = msg;
        }
        last
    };
    assert_eq!(roster.action, Action::Players);
    assert_eq!(roster.data.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn join_to_unknown_game_is_refused() {
    let registry = Arc::new(GameRegistry::new());
    let (tx, mut rx) = mpsc::channel(64);
    let mut session = Session::new(Arc::clone(&registry), tx);

    session
        .on_message(inbound(
            EventName::Game,
            Action::Join,
            json!({"username": "x", "game": 424242}),
        ))
        .await;
    let err = rx.try_recv().unwrap();
    assert_eq!(err.status, Some(Status::Err));
    assert_eq!(err.data, json!("invalid gameId"));
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

#[test]
fn first_loop_event_sequence_with_ten_players() {
    let mut game = nightcourt_engine::Game::new(GameId(10));
    let _seats: Vec<Seat> = (0..10)
        .map(|i| seat(&mut game, &format!("p{i}")))
        .collect();

    use EventName::*;
    let expected = [
        GameStart,
        GreetCitizen,
        GreetCitizen,
        GreetCitizen,
        Night,
        GreetMafia,
        GreetMafia,
        GreetMafia,
        Day,
        Court,
        Court,
        CourtResult,
        Court,
        Night,
        Mafia,
        Mafia,
        Mafia,
    ];

    for (step, want) in expected.iter().enumerate() {
        let got = force_step(&mut game);
        assert_eq!(got, *want, "unexpected event at step {step}");
    }
    assert_eq!(game.iteration(), 2);
}

#[test]
fn barrier_advances_once_every_active_player_accepts() {
    let mut game = Game::new(GameId(11));
    let seats = [
        seat_with_role(&mut game, "m", Role::Mafia),
        seat_with_role(&mut game, "c", Role::Citizen),
        seat_with_role(&mut game, "d", Role::Doctor),
        seat_with_role(&mut game, "g", Role::Girl),
        seat_with_role(&mut game, "s", Role::Sheriff),
    ];
    game.set_current(Box::new(AcceptEvent::new(
        1,
        EventName::GreetCitizen,
        Action::End,
    )));
    game.tick();

    for (index, s) in seats.iter().enumerate() {
        assert_eq!(
            game.current().status(),
            EventStatus::Running,
            "barrier completed after only {index} accepts"
        );
        say(&mut game, s, Action::End, Value::Null);
    }
    assert_eq!(game.current().status(), EventStatus::Done);

    game.tick();
    assert_eq!(game.current().name(), EventName::Night);
}

#[test]
fn role_deal_covers_every_player_and_is_private() {
    let mut game = Game::new(GameId(12));
    let mut seats: Vec<Seat> = (0..10)
        .map(|i| seat(&mut game, &format!("p{i}")))
        .collect();
    game.set_current(Box::new(GreetCitizensEvent::with_rng(
        1,
        StdRng::seed_from_u64(7),
    )));
    game.tick();

    let mut dealt = 0;
    for s in &mut seats {
        let msg = s.expect(EventName::GreetCitizen, Action::Role);
        let role: Role = serde_json::from_value(msg.data).unwrap();
        let held = game.players().get_with_out(s.id).unwrap().role().unwrap();
        assert_eq!(role, held);
        dealt += 1;
        // Exactly one message per player: the deal is private.
        assert!(s.rx.try_recv().is_err());
    }
    assert_eq!(dealt, 10);

    let count = |role| game.players().ids_by_role(role).len();
    assert_eq!(count(Role::Mafia), 3);
    assert_eq!(count(Role::Doctor), 1);
    assert_eq!(count(Role::Girl), 1);
    assert_eq!(count(Role::Sheriff), 1);
    assert_eq!(count(Role::Citizen), 4);
}

// ---------------------------------------------------------------------------
// Nights
// ---------------------------------------------------------------------------

#[test]
fn mafia_vote_kills_the_citizen() {
    let mut game = Game::new(GameId(20));
    game.set_iteration(2);
    let m = seat_with_role(&mut game, "m", Role::Mafia);
    let mut c = seat_with_role(&mut game, "c", Role::Citizen);
    game.set_current(Box::new(MafiaEvent::new(2)));
    game.tick();

    say(&mut game, &m, Action::Vote, json!(c.id));

    game.tick();
    assert_eq!(game.current().name(), EventName::Day);
    game.tick();

    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    assert_eq!(game.current().name(), EventName::NightResult);
    game.tick();

    assert!(game.players().get_with_out(c.id).unwrap().out());
    let out = c.last();
    assert_eq!(out.event, EventName::NightResult);
    assert_eq!(out.action, Action::Out);
    assert_eq!(out.data["id"], json!(c.id));
    assert_eq!(out.data["username"], "c");
}

#[test]
fn doctor_save_spares_the_target() {
    let mut game = Game::new(GameId(21));
    game.set_iteration(2);
    let m = seat_with_role(&mut game, "m", Role::Mafia);
    let mut c = seat_with_role(&mut game, "c", Role::Citizen);
    let d = seat_with_role(&mut game, "d", Role::Doctor);
    game.set_current(Box::new(MafiaEvent::new(2)));
    game.tick();

    // Mafia picks the citizen, the doctor guesses right.
    say(&mut game, &m, Action::Vote, json!(c.id));
    game.tick(); // advance into the doctor barrier
    assert_eq!(game.current().name(), EventName::Doctor);
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    game.tick(); // doctor event processes, sends the roster
    say(&mut game, &d, Action::Choice, json!(c.id));
    game.tick(); // advance into the closing barrier
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    assert_eq!(game.current().name(), EventName::Day);
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    assert_eq!(game.current().name(), EventName::NightResult);
    game.tick();

    assert!(!game.players().get_with_out(c.id).unwrap().out());
    let out = c.last();
    assert_eq!(out.action, Action::Out);
    assert!(out.data.is_null(), "a prevented kill broadcasts no victim");
}

#[test]
fn girl_save_spares_the_target() {
    let mut game = Game::new(GameId(24));
    game.set_iteration(2);
    let m = seat_with_role(&mut game, "m", Role::Mafia);
    let mut c = seat_with_role(&mut game, "c", Role::Citizen);
    let g = seat_with_role(&mut game, "g", Role::Girl);
    game.set_current(Box::new(MafiaEvent::new(2)));
    game.tick();

    // Mafia picks the citizen, the girl spends the night with him.
    say(&mut game, &m, Action::Vote, json!(c.id));
    game.tick(); // advance into the girl barrier
    assert_eq!(game.current().name(), EventName::Girl);
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    game.tick(); // girl event processes, sends the roster
    say(&mut game, &g, Action::Choice, json!(c.id));
    game.tick(); // advance into the closing barrier
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    assert_eq!(game.current().name(), EventName::Day);
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    assert_eq!(game.current().name(), EventName::NightResult);
    game.tick();

    assert!(!game.players().get_with_out(c.id).unwrap().out());
    let out = c.last();
    assert_eq!(out.event, EventName::NightResult);
    assert_eq!(out.action, Action::Out);
    assert!(out.data.is_null(), "a prevented kill broadcasts no victim");
}

#[test]
fn repeated_doctor_target_is_refused() {
    let mut game = Game::new(GameId(22));
    game.set_iteration(2);
    let m = seat_with_role(&mut game, "m", Role::Mafia);
    let c1 = seat_with_role(&mut game, "c1", Role::Citizen);
    let c2 = seat_with_role(&mut game, "c2", Role::Citizen);
    let mut d = seat_with_role(&mut game, "d", Role::Doctor);
    game.set_current(Box::new(MafiaEvent::new(2)));
    game.tick();

    // Night 2: mafia takes c1, doctor protects herself.
    say(&mut game, &m, Action::Vote, json!(c1.id));
    game.tick();
    game.current_mut().set_status(EventStatus::Done); // doctor barrier
    game.tick();
    game.tick();
    say(&mut game, &d, Action::Choice, json!(d.id));
    game.tick();
    game.current_mut().set_status(EventStatus::Done); // closing barrier
    game.tick();
    assert_eq!(game.current().name(), EventName::Day);
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    assert_eq!(game.current().name(), EventName::NightResult);
    game.tick();
    assert!(game.players().get_with_out(c1.id).unwrap().out());

    // Court banishes c2 so the game continues into night 3.
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    game.tick(); // court opening barrier
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    assert_eq!(game.current().name(), EventName::Court);
    game.tick();
    for s in [&m, &c2, &d] {
        say(&mut game, s, Action::Vote, json!(c2.id));
    }
    game.tick();
    assert_eq!(game.current().name(), EventName::CourtResult);
    game.tick();
    assert!(game.players().get_with_out(c2.id).unwrap().out());
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    game.current_mut().set_status(EventStatus::Done); // court closing barrier
    game.tick();
    assert_eq!(game.current().name(), EventName::Night);
    assert_eq!(game.iteration(), 3);

    // Night 3: mafia votes, then the doctor repeats her previous choice.
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    assert_eq!(game.current().name(), EventName::Mafia); // opening barrier
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    game.tick(); // the ballot opens
    say(&mut game, &m, Action::Vote, json!(d.id));
    game.tick();
    game.current_mut().set_status(EventStatus::Done); // mafia closing barrier
    game.tick();
    game.current_mut().set_status(EventStatus::Done); // doctor barrier
    game.tick();
    game.tick(); // the choice opens, roster goes to the doctor
    assert_eq!(game.current().name(), EventName::Doctor);

    d.drain();
    let err = try_say(&mut game, &d, Action::Choice, json!(d.id));
    assert_eq!(err, Err(EngineError::RepeatedTarget));
    let refusal = d.last();
    assert_eq!(refusal.status, Some(Status::Err));
    assert_eq!(
        refusal.data,
        json!("you can not do this action with this player several times in a row")
    );
    assert_eq!(game.current().status(), EventStatus::Running);

    // A different target goes through.
    say(&mut game, &d, Action::Choice, json!(m.id));
    assert_eq!(game.current().status(), EventStatus::Done);
}

#[test]
fn repeated_girl_target_is_refused() {
    let mut game = Game::new(GameId(25));
    game.set_iteration(2);
    let m = seat_with_role(&mut game, "m", Role::Mafia);
    let c1 = seat_with_role(&mut game, "c1", Role::Citizen);
    let c2 = seat_with_role(&mut game, "c2", Role::Citizen);
    let mut g = seat_with_role(&mut game, "g", Role::Girl);
    game.set_current(Box::new(MafiaEvent::new(2)));
    game.tick();

    // Night 2: mafia takes c1, the girl stays home.
    say(&mut game, &m, Action::Vote, json!(c1.id));
    game.tick();
    game.current_mut().set_status(EventStatus::Done); // girl barrier
    game.tick();
    game.tick();
    say(&mut game, &g, Action::Choice, json!(g.id));
    game.tick();
    game.current_mut().set_status(EventStatus::Done); // closing barrier
    game.tick();
    assert_eq!(game.current().name(), EventName::Day);
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    assert_eq!(game.current().name(), EventName::NightResult);
    game.tick();
    assert!(game.players().get_with_out(c1.id).unwrap().out());

    // Court banishes c2 so the game continues into night 3.
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    game.tick(); // court opening barrier
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    assert_eq!(game.current().name(), EventName::Court);
    game.tick();
    for s in [&m, &c2, &g] {
        say(&mut game, s, Action::Vote, json!(c2.id));
    }
    game.tick();
    assert_eq!(game.current().name(), EventName::CourtResult);
    game.tick();
    assert!(game.players().get_with_out(c2.id).unwrap().out());
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    game.current_mut().set_status(EventStatus::Done); // court closing barrier
    game.tick();
    assert_eq!(game.current().name(), EventName::Night);
    assert_eq!(game.iteration(), 3);

    // Night 3: mafia votes, then the girl repeats her previous choice.
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    assert_eq!(game.current().name(), EventName::Mafia); // opening barrier
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    game.tick(); // the ballot opens
    say(&mut game, &m, Action::Vote, json!(g.id));
    game.tick();
    game.current_mut().set_status(EventStatus::Done); // mafia closing barrier
    game.tick();
    game.current_mut().set_status(EventStatus::Done); // girl barrier
    game.tick();
    game.tick(); // the choice opens, roster goes to the girl
    assert_eq!(game.current().name(), EventName::Girl);

    g.drain();
    let err = try_say(&mut game, &g, Action::Choice, json!(g.id));
    assert_eq!(err, Err(EngineError::RepeatedTarget));
    let refusal = g.last();
    assert_eq!(refusal.status, Some(Status::Err));
    assert_eq!(
        refusal.data,
        json!("you can not do this action with this player several times in a row")
    );
    assert_eq!(game.current().status(), EventStatus::Running);

    // A different target goes through.
    say(&mut game, &g, Action::Choice, json!(m.id));
    assert_eq!(game.current().status(), EventStatus::Done);
}

#[test]
fn wrong_role_cannot_act_at_night() {
    let mut game = Game::new(GameId(23));
    game.set_iteration(2);
    let m = seat_with_role(&mut game, "m", Role::Mafia);
    let mut c = seat_with_role(&mut game, "c", Role::Citizen);
    game.set_current(Box::new(MafiaEvent::new(2)));
    game.tick();

    let err = try_say(&mut game, &c, Action::Vote, json!(m.id));
    assert_eq!(err, Err(EngineError::WrongRole));
    let refusal = c.last();
    assert_eq!(refusal.status, Some(Status::Err));
    assert_eq!(refusal.data, json!("player have wrong role for this action"));
    assert_eq!(game.current().status(), EventStatus::Running);
}

// ---------------------------------------------------------------------------
// Court
// ---------------------------------------------------------------------------

#[test]
fn court_tie_banishes_no_one_but_iteration_advances() {
    let mut game = Game::new(GameId(30));
    let m = seat_with_role(&mut game, "m", Role::Mafia);
    let mut a = seat_with_role(&mut game, "a", Role::Citizen);
    let b = seat_with_role(&mut game, "b", Role::Citizen);
    let c = seat_with_role(&mut game, "c", Role::Citizen);
    game.set_current(Box::new(NightResultEvent::new(1)));
    game.tick(); // first iteration: nothing happened at night
    game.tick(); // advance into the court opening barrier

    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    assert_eq!(game.current().name(), EventName::Court);
    game.tick();

    // Two-two split between a and b.
    say(&mut game, &m, Action::Vote, json!(a.id));
    say(&mut game, &a, Action::Vote, json!(b.id));
    say(&mut game, &b, Action::Vote, json!(a.id));
    say(&mut game, &c, Action::Vote, json!(b.id));

    game.tick();
    assert_eq!(game.current().name(), EventName::CourtResult);
    game.tick();

    assert_eq!(game.players().len_active(), 4, "nobody was banished");
    let verdict = a.last();
    assert_eq!(verdict.action, Action::Out);
    assert!(verdict.data.is_null());

    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    game.current_mut().set_status(EventStatus::Done); // closing barrier
    game.tick();
    assert_eq!(game.current().name(), EventName::Night);
    assert_eq!(game.iteration(), 2);
}

#[test]
fn court_vote_is_echoed_by_name() {
    let mut game = Game::new(GameId(31));
    let mut m = seat_with_role(&mut game, "mara", Role::Mafia);
    let b = seat_with_role(&mut game, "boris", Role::Citizen);
    let _c = seat_with_role(&mut game, "cleo", Role::Citizen);
    game.set_current(Box::new(nightcourt_engine::events::CourtEvent::new(1)));
    game.tick();
    m.drain();

    say(&mut game, &m, Action::Vote, json!(b.id));
    let echo = m.expect(EventName::Court, Action::Vote);
    assert_eq!(echo.data, json!({"player": "mara", "vote": "boris"}));
}

// ---------------------------------------------------------------------------
// Termination
// ---------------------------------------------------------------------------

#[test]
fn last_citizen_killed_ends_the_game_for_mafia() {
    let mut game = Game::new(GameId(40));
    game.set_iteration(2);
    let mut m = seat_with_role(&mut game, "m", Role::Mafia);
    let mut c = seat_with_role(&mut game, "c", Role::Citizen);
    game.set_current(Box::new(MafiaEvent::new(2)));
    game.tick();

    say(&mut game, &m, Action::Vote, json!(c.id));
    game.tick(); // day barrier
    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    assert_eq!(game.current().name(), EventName::NightResult);
    game.tick(); // citizen dies here

    assert!(game.players().get_with_out(c.id).unwrap().out());
    game.current_mut().set_status(EventStatus::Done);
    game.tick();

    assert_eq!(game.current().name(), EventName::GameOver);
    assert_eq!(game.winner(), Some(Role::Mafia));
    game.tick();

    // Everyone hears the verdict, the eliminated citizen included.
    for s in [&mut m, &mut c] {
        let over = s.last();
        assert_eq!(over.event, EventName::GameOver);
        assert_eq!(over.action, Action::Over);
        assert_eq!(over.data, json!(2));
    }

    // The terminal event closes once everyone has acknowledged.
    say(&mut game, &m, Action::Accept, Value::Null);
    assert_eq!(game.current().status(), EventStatus::Running);
    say(&mut game, &c, Action::Accept, Value::Null);
    assert_eq!(game.current().status(), EventStatus::Done);
}

#[test]
fn dead_mafia_ends_the_game_for_citizens() {
    let mut game = Game::new(GameId(41));
    let m = seat_with_role(&mut game, "m", Role::Mafia);
    let a = seat_with_role(&mut game, "a", Role::Citizen);
    let b = seat_with_role(&mut game, "b", Role::Citizen);
    game.set_current(Box::new(NightResultEvent::new(1)));
    game.tick();
    game.tick();

    game.current_mut().set_status(EventStatus::Done);
    game.tick(); // court
    game.tick();
    for s in [&m, &a, &b] {
        say(&mut game, s, Action::Vote, json!(m.id));
    }
    game.tick(); // court result
    game.tick(); // mafia banished

    game.current_mut().set_status(EventStatus::Done);
    game.tick();
    game.current_mut().set_status(EventStatus::Done); // closing barrier
    game.tick();

    assert_eq!(game.current().name(), EventName::GameOver);
    assert_eq!(game.winner(), Some(Role::Citizen));
}

// ---------------------------------------------------------------------------
// Reconnect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reconnect_replays_the_last_outbound_message() {
    let registry = Arc::new(GameRegistry::new());
    let (game_id, game) = registry.create().await;

    let citizen_id;
    {
        let mut g = game.lock().await;
        g.set_iteration(2);
        let _m = seat_with_role(&mut g, "m", Role::Mafia);
        let c = seat_with_role(&mut g, "c", Role::Citizen);
        citizen_id = c.id;
        g.set_current(Box::new(AcceptEvent::new(2, EventName::Day, Action::Start)));
    }

    // Let the driver process the barrier, then acknowledge it for everyone.
    tokio::time::sleep(Duration::from_millis(20)).await;
    {
        let mut g = game.lock().await;
        let ids = g.players().ids_active();
        for id in ids {
            let msg = inbound(EventName::Day, Action::Start, Value::Null);
            let _ = g.on_message(id, &msg);
        }
    }
    // The driver advances into night_result, which broadcasts the (empty)
    // outcome, the last replayable message for every player.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let (tx, mut rx) = mpsc::channel(64);
    let mut session = Session::new(Arc::clone(&registry), tx);
    session
        .on_message(inbound(
            EventName::Game,
            Action::Reconnect,
            json!({"game": game_id.0, "player": citizen_id.0}),
        ))
        .await;

    let replay = rx.try_recv().expect("reconnect should replay something");
    assert_eq!(replay.event, EventName::NightResult);
    assert_eq!(replay.action, Action::Out);
    assert_eq!(replay.status, Some(Status::Ok));

    // The reconnected identity is the original player.
    assert_eq!(session.player_id(), Some(citizen_id));
}

#[tokio::test]
async fn reconnect_with_bad_ids_is_refused() {
    let registry = Arc::new(GameRegistry::new());
    let (game_id, game) = registry.create().await;
    {
        let mut g = game.lock().await;
        let _a = seat_with_role(&mut g, "a", Role::Citizen);
    }

    let (tx, mut rx) = mpsc::channel(64);
    let mut session = Session::new(Arc::clone(&registry), tx);

    session
        .on_message(inbound(
            EventName::Game,
            Action::Reconnect,
            json!({"game": 999_999, "player": 1}),
        ))
        .await;
    assert_eq!(rx.try_recv().unwrap().data, json!("invalid gameId"));

    session
        .on_message(inbound(
            EventName::Game,
            Action::Reconnect,
            json!({"game": game_id.0, "player": 123}),
        ))
        .await;
    assert_eq!(rx.try_recv().unwrap().data, json!("invalid playerId"));
}
