use super::*;
use crate::mocks::{FixedClock, FixedEntropy, MockPlatform};
use banroyale_types::{ChannelId, GameSettings, Member, MemberId, Role, RoleId, SpaceId};
use futures::future::join;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

const SPACE: SpaceId = SpaceId(1);
const CONTROLLER_ROLE: RoleId = RoleId(10);
const ELIMINATION_CHANNEL: ChannelId = ChannelId(20);
const LOG_CHANNEL: ChannelId = ChannelId(21);
const COMMAND_CHANNEL: ChannelId = ChannelId(22);
const NOW: u64 = 1_722_470_400;

struct Harness {
    session: GameSession<MockPlatform>,
    platform: Arc<MockPlatform>,
    _dir: TempDir,
}

fn host() -> Member {
    Member::new(900, "host").with_role(Role {
        id: CONTROLLER_ROLE,
        name: "Game Master".into(),
        rank: 50,
    })
}

fn player(id: u64) -> Member {
    Member::new(id, format!("player{id}"))
}

fn ranked(id: u64, rank: u32) -> Member {
    player(id).with_role(Role {
        id: RoleId(500 + u64::from(rank)),
        name: format!("level-{rank}"),
        rank,
    })
}

fn harness(players: impl IntoIterator<Item = Member>, entropy: FixedEntropy) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(
        MockPlatform::new().with_members(std::iter::once(host()).chain(players)),
    );
    let store = Arc::new(RecordStore::new(dir.path().join("records.json")));
    let settings = GameSettings::new(CONTROLLER_ROLE, ELIMINATION_CHANNEL, LOG_CHANNEL);
    let session = GameSession::new(platform.clone(), store, settings)
        .with_entropy(entropy)
        .with_clock(FixedClock(NOW));
    Harness {
        session,
        platform,
        _dir: dir,
    }
}

fn always_hit(players: impl IntoIterator<Item = Member>) -> Harness {
    harness(players, FixedEntropy::always(0.0))
}

fn eliminated(attempt: Attempt) -> Elimination {
    match attempt {
        Attempt::Eliminated(elimination) => elimination,
        Attempt::Missed { .. } => panic!("expected an elimination"),
    }
}

#[tokio::test(start_paused = true)]
async fn last_participant_standing_wins() {
    let (a, b, c) = (player(1), player(2), player(3));
    let h = always_hit([a.clone(), b.clone(), c.clone()]);

    let enabled = h.session.enable(SPACE, &host()).await.unwrap();
    assert_eq!(enabled.participants, 3);
    assert_eq!(h.session.phase(SPACE).await, Phase::Enabled);

    let first = eliminated(h.session.attempt_elimination(SPACE, &c, Some(&a)).await.unwrap());
    assert_eq!(first.session_count, 1);
    assert!(first.game_end.is_none());

    let second = eliminated(h.session.attempt_elimination(SPACE, &c, Some(&b)).await.unwrap());
    assert_eq!(second.session_count, 2);
    match second.game_end {
        Some(GameEnd::Victory { winner, effective }) => {
            assert_eq!(winner.id, c.id);
            assert_eq!(effective, 3);
        }
        other => panic!("unexpected end: {other:?}"),
    }
    assert_eq!(h.session.phase(SPACE).await, Phase::Disabled);

    // Records survive the win until an explicit reset.
    let records = h.session.load_records(SPACE).unwrap();
    assert_eq!(records.eliminated_count(), 2);
    assert_eq!(records.get(a.id).unwrap().eliminated_at, NOW);
    assert_eq!(records.get(b.id).unwrap().eliminated_by, "player3");
    let remaining: Vec<MemberId> = h
        .session
        .remaining(SPACE)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(remaining, vec![c.id]);

    let announced = h.platform.posts_to(ELIMINATION_CHANNEL);
    assert!(announced.iter().any(|p| p.contains("player3 is the champion")));
    assert!(h
        .platform
        .posts_to(LOG_CHANNEL)
        .iter()
        .any(|p| p.contains("champion")));

    assert!(h.session.reset_game_state(SPACE).await.unwrap());
    assert!(h.session.load_records(SPACE).unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn non_participant_actor_can_cause_total_elimination() {
    let a = player(1);
    let h = always_hit([a.clone(), player(2)]);
    h.session.enable(SPACE, &host()).await.unwrap();

    let first = eliminated(h.session.attempt_elimination(SPACE, &host(), Some(&a)).await.unwrap());
    assert!(matches!(first.game_end, Some(GameEnd::Victory { .. })));

    h.session.enable(SPACE, &host()).await.unwrap();
    let last = player(2);
    let second = eliminated(
        h.session
            .attempt_elimination(SPACE, &host(), Some(&last))
            .await
            .unwrap(),
    );
    assert_eq!(
        second.game_end,
        Some(GameEnd::TotalElimination { effective: 2 })
    );
    assert!(h
        .platform
        .posts_to(LOG_CHANNEL)
        .iter()
        .any(|p| p.contains("have been eliminated")));
}

#[tokio::test(start_paused = true)]
async fn lifecycle_conflicts() {
    let h = always_hit([player(1), player(2)]);

    assert!(matches!(
        h.session.disable(SPACE, &host()).await,
        Err(GameError::AlreadyDisabled)
    ));
    assert!(matches!(
        h.session
            .attempt_elimination(SPACE, &player(1), Some(&player(2)))
            .await,
        Err(GameError::GameDisabled)
    ));
    assert!(matches!(
        h.session.check_win_condition(SPACE).await,
        Err(GameError::GameDisabled)
    ));

    h.session.enable(SPACE, &host()).await.unwrap();
    let err = h.session.enable(SPACE, &host()).await.unwrap_err();
    assert!(matches!(err, GameError::AlreadyEnabled));
    assert_eq!(err.kind(), ErrorKind::GameStateConflict);

    h.session.disable(SPACE, &host()).await.unwrap();
    assert_eq!(h.session.phase(SPACE).await, Phase::Disabled);
}

#[tokio::test(start_paused = true)]
async fn administration_requires_controller_role() {
    let h = always_hit([player(1), player(2)]);
    for err in [
        h.session.enable(SPACE, &player(1)).await.unwrap_err(),
        h.session.disable(SPACE, &player(1)).await.unwrap_err(),
        h.session
            .configure(SPACE, &player(1), SettingsChange::ToggleDecay)
            .await
            .unwrap_err(),
        h.session
            .unban_all(SPACE, &player(1), COMMAND_CHANNEL)
            .await
            .unwrap_err(),
        h.session
            .end_game(SPACE, &player(1), COMMAND_CHANNEL)
            .await
            .unwrap_err(),
    ] {
        assert!(matches!(err, GameError::PermissionDenied), "{err}");
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }
    assert!(!h.session.settings().decay_mode());
    assert_eq!(h.session.phase(SPACE).await, Phase::Disabled);
}

#[tokio::test(start_paused = true)]
async fn target_rules() {
    let (a, strong, peer) = (player(1), ranked(2, 5), ranked(3, 5));
    let h = always_hit([a.clone(), strong.clone(), peer.clone(), player(4), player(5)]);
    h.session.enable(SPACE, &host()).await.unwrap();

    let check = |result: Result<Attempt, GameError>, expected: TargetError| match result {
        Err(GameError::InvalidTarget(err)) => assert_eq!(err, expected),
        other => panic!("expected {expected:?}, got {other:?}"),
    };
    check(
        h.session.attempt_elimination(SPACE, &a, None).await,
        TargetError::Missing,
    );
    check(
        h.session.attempt_elimination(SPACE, &a, Some(&a)).await,
        TargetError::SelfTarget,
    );
    check(
        h.session
            .attempt_elimination(SPACE, &strong, Some(&peer))
            .await,
        TargetError::Outranked,
    );
    check(
        h.session
            .attempt_elimination(SPACE, &ranked(6, 1), Some(&peer))
            .await,
        TargetError::Outranked,
    );

    // Unranked actors may target anyone.
    let hit = h.session.attempt_elimination(SPACE, &a, Some(&peer)).await.unwrap();
    assert!(matches!(hit, Attempt::Eliminated(_)));
    // A higher rank may target a lower one.
    let hit = h
        .session
        .attempt_elimination(SPACE, &strong, Some(&player(4)))
        .await
        .unwrap();
    assert!(matches!(hit, Attempt::Eliminated(_)));
}

#[tokio::test(start_paused = true)]
async fn spectator_role_holders_cannot_eliminate() {
    let h = always_hit([player(1), player(2), player(3)]);
    h.session.enable(SPACE, &host()).await.unwrap();
    let spectator = player(1).with_role(Role {
        id: RoleId(77),
        name: h.session.settings().spectator_role().to_string(),
        rank: 0,
    });
    let err = h
        .session
        .attempt_elimination(SPACE, &spectator, Some(&player(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::SpectatorForbidden));
    assert!(h.session.load_records(SPACE).unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn miss_changes_nothing() {
    let h = harness(
        [player(1), player(2), player(3)],
        FixedEntropy::sequence([0.995, 0.99], 0.0),
    );
    h.session.enable(SPACE, &host()).await.unwrap();

    // Default chance is 0.99; a sample equal to it misses as well.
    for _ in 0..2 {
        let attempt = h
            .session
            .attempt_elimination(SPACE, &player(1), Some(&player(2)))
            .await
            .unwrap();
        assert!(matches!(attempt, Attempt::Missed { chance, .. } if chance == 0.99));
    }
    assert!(h.session.load_records(SPACE).unwrap().is_empty());
    assert!(h.platform.member(MemberId(2)).is_some());
    assert_eq!(h.platform.eliminate_calls(MemberId(2)), 0);

    let hit = eliminated(
        h.session
            .attempt_elimination(SPACE, &player(1), Some(&player(2)))
            .await
            .unwrap(),
    );
    assert_eq!(hit.session_count, 1);
}

#[tokio::test(start_paused = true)]
async fn decay_checkpoints_fire_once() {
    // 20 participants: one actor and 19 targets.
    let actor = player(100);
    let targets: Vec<Member> = (1..=19).map(player).collect();
    let h = always_hit(std::iter::once(actor.clone()).chain(targets.clone()));
    let controller = host();
    h.session
        .configure(SPACE, &controller, SettingsChange::DecayMin(10.0))
        .await
        .unwrap();
    h.session
        .configure(SPACE, &controller, SettingsChange::DecayMax(90.0))
        .await
        .unwrap();
    let applied = h
        .session
        .configure(SPACE, &controller, SettingsChange::ToggleDecay)
        .await
        .unwrap();
    assert_eq!(
        applied,
        SettingsApplied::DecayMode {
            enabled: true,
            effective: Some(20)
        }
    );
    h.session.enable(SPACE, &controller).await.unwrap();

    let mut fired = Vec::new();
    for target in &targets[..4] {
        let hit = eliminated(
            h.session
                .attempt_elimination(SPACE, &actor, Some(target))
                .await
                .unwrap(),
        );
        fired.push(hit.checkpoints.iter().map(|c| c.threshold).collect::<Vec<_>>());
    }
    // Eliminated members leave the space but still count towards the game.
    assert_eq!(fired, vec![vec![], vec![10], vec![], vec![20]]);

    let checkpoints = h.session.store().list_checkpoints(SPACE).unwrap();
    assert_eq!(checkpoints.into_iter().collect::<Vec<_>>(), vec![10, 20]);
    let logged: Vec<String> = h
        .platform
        .posts_to(LOG_CHANNEL)
        .into_iter()
        .filter(|p| p.contains("checkpoint"))
        .collect();
    assert_eq!(logged.len(), 2);
    assert!(logged[0].contains("checkpoint 10%"));

    // 16 of 20 standing: 0.1 + 0.8 * 16/20.
    let chance = h.session.current_chance(SPACE).await.unwrap();
    assert!((chance - 0.74).abs() < 1e-9, "chance={chance}");
    let status = h.session.status(SPACE).await.unwrap();
    assert_eq!((status.effective, status.eliminated, status.remaining), (20, 4, 16));
}

#[tokio::test(start_paused = true)]
async fn static_mode_logs_no_checkpoints() {
    let actor = player(100);
    let h = always_hit([actor.clone(), player(1), player(2), player(3)]);
    h.session.enable(SPACE, &host()).await.unwrap();
    let hit = eliminated(
        h.session
            .attempt_elimination(SPACE, &actor, Some(&player(1)))
            .await
            .unwrap(),
    );
    assert!(hit.checkpoints.is_empty());
    assert!(h.session.store().list_checkpoints(SPACE).unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn reset_clears_records_and_checkpoints() {
    let actor = player(100);
    let h = always_hit([actor.clone(), player(1), player(2), player(3)]);
    h.session.enable(SPACE, &host()).await.unwrap();
    h.session
        .attempt_elimination(SPACE, &actor, Some(&player(1)))
        .await
        .unwrap();
    h.session.store().add_checkpoint(SPACE, 20).unwrap();

    assert!(h.session.reset_game_state(SPACE).await.unwrap());
    assert!(h.session.load_records(SPACE).unwrap().is_empty());
    assert!(h.session.store().list_checkpoints(SPACE).unwrap().is_empty());
    assert!(!h.session.reset_game_state(SPACE).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn late_joiners_become_spectators_once() {
    let h = always_hit([player(1), player(2), player(3)]);
    let late = player(9);
    assert!(!h.session.member_joined(SPACE, &late).await);

    h.session.enable(SPACE, &host()).await.unwrap();
    h.platform.add_member(late.clone());
    assert!(h.session.member_joined(SPACE, &late).await);
    assert!(!h.session.member_joined(SPACE, &late).await);
    assert_eq!(h.platform.notices_to(late.id).len(), 1);
    let spectator_role = h.session.settings().spectator_role().to_string();
    assert!(h.platform.member(late.id).unwrap().has_role_named(&spectator_role));

    // Tracked even when the actor's role list is stale.
    let err = h
        .session
        .attempt_elimination(SPACE, &late, Some(&player(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::SpectatorForbidden));

    // An initial participant who leaves and rejoins is not a spectator.
    h.platform.remove_member(MemberId(2));
    h.platform.add_member(player(2));
    assert!(!h.session.member_joined(SPACE, &player(2)).await);
    assert!(h.platform.notices_to(MemberId(2)).is_empty());

    // Platform accounts are ignored.
    assert!(!h.session.member_joined(SPACE, &player(10).bot()).await);
}

#[tokio::test(start_paused = true)]
async fn disable_during_countdown_is_deferred() {
    let h = always_hit([player(1), player(2)]);
    let controller = host();
    let start = Instant::now();

    let (enabled, disabled) = join(h.session.enable(SPACE, &controller), async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(h.session.phase(SPACE).await, Phase::Enabling);
        assert!(matches!(
            h.session
                .attempt_elimination(SPACE, &player(1), Some(&player(2)))
                .await,
            Err(GameError::GameDisabled)
        ));
        let result = h.session.disable(SPACE, &controller).await;
        (result, start.elapsed())
    })
    .await;

    assert_eq!(enabled.unwrap().participants, 2);
    let (result, at) = disabled;
    result.unwrap();
    assert!(at >= Duration::from_secs(10), "disabled after {at:?}");
    assert_eq!(h.session.phase(SPACE).await, Phase::Disabled);
}

#[tokio::test(start_paused = true)]
async fn concurrent_attempts_are_serialized() {
    let (a, b) = (player(1), player(2));
    let h = always_hit([a.clone(), b.clone(), player(3), player(4), player(5)]);
    h.session.enable(SPACE, &host()).await.unwrap();

    let start = Instant::now();
    let (first, second) = join(
        h.session.attempt_elimination(SPACE, &a, Some(&player(3))),
        h.session.attempt_elimination(SPACE, &b, Some(&player(4))),
    )
    .await;
    // Each hit holds the space for the 2s elimination delay.
    assert!(start.elapsed() >= Duration::from_secs(4));
    assert_eq!(eliminated(first.unwrap()).session_count, 1);
    assert_eq!(eliminated(second.unwrap()).session_count, 1);
    assert_eq!(h.session.load_records(SPACE).unwrap().eliminated_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_elimination_is_retried() {
    let h = always_hit([player(1), player(2), player(3), player(4)]);
    h.session.enable(SPACE, &host()).await.unwrap();

    h.platform.script_eliminate(
        MemberId(2),
        vec![PlatformError::RateLimited, PlatformError::RateLimited],
    );
    let hit = h
        .session
        .attempt_elimination(SPACE, &player(1), Some(&player(2)))
        .await
        .unwrap();
    assert!(matches!(hit, Attempt::Eliminated(_)));
    assert_eq!(h.platform.eliminate_calls(MemberId(2)), 3);

    h.platform
        .script_eliminate(MemberId(3), vec![PlatformError::RateLimited; 3]);
    let err = h
        .session
        .attempt_elimination(SPACE, &player(1), Some(&player(3)))
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::ExternalRateLimited { attempts: 3 }));
    assert!(!h.session.load_records(SPACE).unwrap().contains(MemberId(3)));

    h.platform
        .script_eliminate(MemberId(4), vec![PlatformError::PermissionDenied]);
    let err = h
        .session
        .attempt_elimination(SPACE, &player(1), Some(&player(4)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalPermissionDenied);
    assert_eq!(h.platform.eliminate_calls(MemberId(4)), 1);
}

#[tokio::test(start_paused = true)]
async fn unban_all_reverses_and_logs() {
    let actor = player(100);
    let h = always_hit([actor.clone(), player(1), player(2), player(3)]);
    assert!(matches!(
        h.session.unban_all(SPACE, &host(), COMMAND_CHANNEL).await,
        Err(GameError::NoRecords)
    ));

    h.session.enable(SPACE, &host()).await.unwrap();
    for id in [1, 2] {
        h.session
            .attempt_elimination(SPACE, &actor, Some(&player(id)))
            .await
            .unwrap();
    }
    let report = h
        .session
        .unban_all(SPACE, &host(), COMMAND_CHANNEL)
        .await
        .unwrap();
    assert_eq!(report.reversed, 2);
    assert_eq!(report.failed, 0);
    assert!(h.platform.banned().is_empty());
    assert!(h.session.load_records(SPACE).unwrap().is_empty());
    assert!(h
        .platform
        .posts_to(LOG_CHANNEL)
        .iter()
        .any(|p| p.contains("reversed all eliminations")));
    // The game keeps running.
    assert_eq!(h.session.phase(SPACE).await, Phase::Enabled);
}

#[tokio::test(start_paused = true)]
async fn end_game_cleans_up() {
    let actor = player(100);
    let h = always_hit([actor.clone(), player(1), player(2), player(3)]);
    let controller = host();
    assert!(matches!(
        h.session.end_game(SPACE, &controller, COMMAND_CHANNEL).await,
        Err(GameError::NoRecords)
    ));

    h.session
        .configure(SPACE, &controller, SettingsChange::ToggleDecay)
        .await
        .unwrap();
    h.session.enable(SPACE, &controller).await.unwrap();
    for id in [1, 2] {
        h.session
            .attempt_elimination(SPACE, &actor, Some(&player(id)))
            .await
            .unwrap();
    }
    let late = player(9);
    h.platform.add_member(late.clone());
    assert!(h.session.member_joined(SPACE, &late).await);

    let summary = h
        .session
        .end_game(SPACE, &controller, COMMAND_CHANNEL)
        .await
        .unwrap();
    assert_eq!(summary.eliminated, 2);
    // The late joiner still counts as a participant.
    assert_eq!(summary.effective, 5);
    assert_eq!(summary.remaining, 3);
    assert_eq!(summary.reversal.reversed, 2);
    assert!(summary.was_enabled);
    assert!(summary.decay_reset);
    assert_eq!(summary.spectators_cleared, 1);

    assert_eq!(h.session.phase(SPACE).await, Phase::Disabled);
    assert!(!h.session.settings().decay_mode());
    assert!(h.session.load_records(SPACE).unwrap().is_empty());
    assert!(h.session.store().list_checkpoints(SPACE).unwrap().is_empty());
    let spectator_role = h.session.settings().spectator_role().to_string();
    assert!(!h.platform.member(late.id).unwrap().has_role_named(&spectator_role));
    assert!(!h.session.reset_game_state(SPACE).await.unwrap());

    let ended: Vec<String> = h
        .platform
        .posts_to(LOG_CHANNEL)
        .into_iter()
        .filter(|p| p.contains("GAME ENDED"))
        .collect();
    assert_eq!(ended.len(), 1);
    assert!(ended[0].starts_with("🏁 GAME ENDED by host"), "{}", ended[0]);
    assert!(ended[0].contains("Final stats: 2/5 eliminated, 3 remained"));
    assert!(ended[0].contains("Reversed: 2, Failed: 0"));
    assert!(ended[0].ends_with("Ban Royale disabled, Decay mode reset"));
}

#[tokio::test(start_paused = true)]
async fn queries_do_not_wait_for_elimination_delay() {
    let actor = player(100);
    let h = always_hit([actor.clone(), player(1), player(2), player(3)]);
    h.session
        .configure(SPACE, &host(), SettingsChange::EliminationDelay(60.0))
        .await
        .unwrap();
    h.session.enable(SPACE, &host()).await.unwrap();
    let late = player(9);
    h.platform.add_member(late.clone());

    let start = Instant::now();
    let (hit, (status, marked, answered)) = join(
        h.session.attempt_elimination(SPACE, &actor, Some(&player(1))),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let status = h.session.status(SPACE).await.unwrap();
            let marked = h.session.member_joined(SPACE, &late).await;
            (status, marked, start.elapsed())
        },
    )
    .await;

    assert!(answered < Duration::from_secs(1), "answered after {answered:?}");
    assert_eq!(status.phase, Phase::Enabled);
    assert_eq!(status.eliminated, 1);
    assert!(marked);
    eliminated(hit.unwrap());
    // The attempt itself still holds the space for the full delay.
    assert!(start.elapsed() >= Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn status_reports_progress() {
    let actor = player(100);
    let h = always_hit([actor.clone(), player(1), player(2), player(3)]);
    h.session.enable(SPACE, &host()).await.unwrap();
    h.session
        .attempt_elimination(SPACE, &actor, Some(&player(1)))
        .await
        .unwrap();

    let status = h.session.status(SPACE).await.unwrap();
    assert_eq!(status.phase, Phase::Enabled);
    assert_eq!(status.effective, 4);
    assert_eq!(status.eliminated, 1);
    assert_eq!(status.remaining, 3);
    assert_eq!(status.tier(), StatusTier::FinalShowdown);
    assert_eq!(status.chance, 0.99);
    // The eliminated member has left the space.
    assert_eq!(h.session.effective_count(SPACE).await.unwrap(), 3);
}

async fn apply(h: &Harness, change: SettingsChange) -> Result<SettingsApplied, GameError> {
    h.session.configure(SPACE, &host(), change).await
}

#[tokio::test]
async fn configure_validates_percentages() {
    let h = always_hit([player(1)]);

    assert_eq!(
        apply(&h, SettingsChange::EliminationChance(50.0)).await.unwrap(),
        SettingsApplied::EliminationChance(0.5)
    );
    let err = apply(&h, SettingsChange::EliminationChance(0.001))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    assert!(apply(&h, SettingsChange::EliminationChance(100.5)).await.is_err());
    assert_eq!(h.session.settings().elimination_chance(), 0.5);

    assert_eq!(
        apply(&h, SettingsChange::EliminationDelay(0.0)).await.unwrap(),
        SettingsApplied::EliminationDelay(0.0)
    );
    assert!(apply(&h, SettingsChange::EliminationDelay(61.0)).await.is_err());

    assert!(apply(&h, SettingsChange::DecayMin(95.0)).await.is_ok());
    assert!(apply(&h, SettingsChange::DecayMax(90.0)).await.is_err());
    assert!(apply(&h, SettingsChange::DecayMin(99.0)).await.is_err());
    let settings = h.session.settings();
    assert!((settings.min_decay_chance() - 0.95).abs() < 1e-12);
    assert!(settings.min_decay_chance() < settings.max_decay_chance());

    assert_eq!(
        apply(&h, SettingsChange::ToggleDecay).await.unwrap(),
        SettingsApplied::DecayMode {
            enabled: true,
            effective: Some(1)
        }
    );
    assert_eq!(
        apply(&h, SettingsChange::ToggleDecay).await.unwrap(),
        SettingsApplied::DecayMode {
            enabled: false,
            effective: None
        }
    );
}

#[tokio::test]
async fn missing_controller_means_no_participants() {
    let h = always_hit([player(1), player(2)]);
    h.platform.set_controller(None);
    assert_eq!(h.session.effective_count(SPACE).await.unwrap(), 0);
    assert_eq!(h.session.current_chance(SPACE).await.unwrap(), 0.99);
}
