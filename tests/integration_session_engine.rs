use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use typewise::runtime::Countdown;
use typewise::session::{ManualClock, Phase, Session, SessionConfig};

const TARGET: &str = "the quick brown fox jumps over the lazy dog";

enum Event {
    Char(char),
    Backspace,
    Tick,
    Wait(u64),
}

fn random_events(rng: &mut StdRng, n: usize) -> Vec<Event> {
    (0..n)
        .map(|_| match rng.gen_range(0..10) {
            0..=5 => Event::Char(rng.gen_range(b'a'..=b'z') as char),
            6 => Event::Backspace,
            7 => Event::Tick,
            _ => Event::Wait(rng.gen_range(0..1500)),
        })
        .collect()
}

// Random keystroke, tick and pause sequences must respect the session invariants
#[test]
fn random_sequences_keep_invariants() {
    for seed in 0..50u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let clock = ManualClock::new();
        let config = SessionConfig::new(TARGET, 20).allow_backspace(seed % 2 == 0);
        let mut session = Session::with_clock(config, clock.clone()).unwrap();

        let mut phases = vec![session.phase()];
        let mut reports = 0;
        let mut last_remaining = session.seconds_remaining();

        for event in random_events(&mut rng, 400) {
            let before = session.input().len();
            let report = match event {
                Event::Char(c) => session.type_char(c),
                Event::Backspace => {
                    session.backspace();
                    None
                }
                Event::Tick => session.tick(),
                Event::Wait(ms) => {
                    clock.advance(Duration::from_millis(ms));
                    None
                }
            };
            if report.is_some() {
                reports += 1;
            }

            if !session.allow_backspace() {
                assert!(session.input().len() >= before, "seed {seed}: input shrank");
            }
            assert!(session.input().len() <= TARGET.len());
            assert!(session.seconds_remaining() <= last_remaining);
            last_remaining = session.seconds_remaining();

            let stats = session.current_stats();
            assert!((0.0..=100.0).contains(&stats.accuracy));
            assert!(stats.net_wpm >= 0.0);

            if phases.last() != Some(&session.phase()) {
                phases.push(session.phase());
            }
        }

        assert!(reports <= 1, "seed {seed}: {reports} reports");
        assert_eq!(reports == 1, session.phase() == Phase::Finished);
        let expected = [Phase::Idle, Phase::Active, Phase::Finished];
        assert_eq!(phases.as_slice(), &expected[..phases.len()]);
    }
}

#[test]
fn finished_session_stats_are_frozen() {
    let clock = ManualClock::new();
    let mut session = Session::with_clock(SessionConfig::new("hello", 60), clock.clone()).unwrap();

    session.type_char('h');
    clock.advance(Duration::from_secs(6));
    let report = session.submit_input("hello").unwrap();
    let stats = session.current_stats();

    for _ in 0..10 {
        clock.advance(Duration::from_secs(7));
        assert_eq!(session.tick(), None);
        assert_eq!(session.submit_input("hellx"), None);
    }

    assert_eq!(session.current_stats(), stats);
    assert_eq!(session.report(), Some(&report));
    assert_eq!(report.wpm, 10);
}

#[test]
fn countdown_and_completion_race_emits_once() {
    let clock = ManualClock::new();
    let mut session = Session::with_clock(SessionConfig::new("ab", 1), clock.clone()).unwrap();

    session.type_char('a');
    let mut countdown = Countdown::arm(&session).unwrap();
    clock.advance(Duration::from_secs(1));

    // the last key and the expiring second land in the same turn
    let by_key = session.type_char('b');
    let by_timer = countdown.poll(&mut session);

    assert!(by_key.is_some());
    assert!(by_timer.is_none());
    assert_eq!(session.seconds_remaining(), 1);
}

#[test]
fn sixty_second_test_runs_sixty_ticks() {
    let clock = ManualClock::new();
    let mut session = Session::with_clock(SessionConfig::new(TARGET, 60), clock.clone()).unwrap();
    session.type_char('t');
    let mut countdown = Countdown::arm(&session).unwrap();

    let mut seconds = 0;
    while session.phase() == Phase::Active {
        clock.advance(Duration::from_secs(1));
        seconds += 1;
        countdown.poll(&mut session);
    }

    assert_eq!(seconds, 60);
    let report = session.report().unwrap();
    assert_eq!(report.time_spent_secs, 60.0);
    assert_eq!(report.total_chars, 1);
}
