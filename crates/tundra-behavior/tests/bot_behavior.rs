//! Activity loops and reactions driven against an in-memory world.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tundra_behavior::{
    ActivityExit, BehaviorConfig, BehaviorContext, BehaviorError, BotController, Feature, Span,
};
use tundra_types::{
    AgentId, ClothingSlot, Occupant, Outfit, Position, RoomEventKind, RoomId, RoomSpot,
    SafeMessage, WaddleId, WorldEvent, emotes,
};
use tundra_world::{Bot, EventLog, RoomDirectory, RoomLayouts, WorldMirror};

struct World {
    log: Arc<EventLog>,
    mirror: Arc<WorldMirror>,
    ctx: Arc<BehaviorContext>,
}

fn world(config: BehaviorConfig, layouts: RoomLayouts) -> World {
    let log = Arc::new(EventLog::new());
    let mirror = Arc::new(WorldMirror::new());
    let ctx = Arc::new(BehaviorContext::new(
        config,
        layouts,
        Arc::clone(&log) as _,
        Arc::clone(&mirror) as _,
    ));
    World { log, mirror, ctx }
}

fn player(world: &World, room: u32, x: i32, y: i32) -> Occupant {
    let player = Occupant {
        id: AgentId::new(),
        nickname: String::from("Rookie"),
        room: RoomId(room),
        position: Position::new(x, y),
        is_bot: false,
    };
    world.mirror.apply_world(&WorldEvent::PlayerJoinedRoom {
        player: player.clone(),
    });
    player
}

fn controller_at(world: &World, room: u32, x: i32, y: i32, outfit: Outfit) -> BotController {
    let bot = Arc::new(Bot::new(AgentId::new(), "Cadence", outfit));
    let controller = BotController::new(bot, Arc::clone(&world.ctx));
    controller.actions().join_room(RoomId(room), Position::new(x, y));
    controller
}

fn single_spot_layouts() -> RoomLayouts {
    RoomLayouts::new()
        .with_spots(
            RoomId(1),
            [RoomSpot::new(200, 200, 26, 2).wearing([(ClothingSlot::Hand, 340)])],
        )
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn initialize_places_ambient_bot_in_configured_room() {
    let config = BehaviorConfig {
        bot_rooms: vec![RoomId(100), RoomId(110)],
        ..BehaviorConfig::default()
    };
    let world = world(config, RoomLayouts::standard());
    let bot = Arc::new(Bot::new(AgentId::new(), "Gary", Outfit::empty()));
    let controller = BotController::new(Arc::clone(&bot), Arc::clone(&world.ctx));

    controller.initialize().unwrap();
    let room = bot.room().unwrap();
    assert!(room == RoomId(100) || room == RoomId(110));

    // A second hop never lands in the same room.
    controller.actions().randomize_room().unwrap();
    assert_ne!(bot.room(), Some(room));
}

#[tokio::test(start_paused = true)]
async fn activity_loop_emits_until_stopped() {
    let world = world(BehaviorConfig::default(), RoomLayouts::standard());
    let controller = controller_at(&world, 100, 300, 350, Outfit::empty());
    let id = controller.id();

    controller.begin_activity();
    assert!(controller.is_active());
    tokio::time::sleep(Duration::from_secs(120)).await;

    let kinds = world.log.kinds_for(id);
    assert!(kinds.iter().any(|k| matches!(k, RoomEventKind::Frame { .. })));
    assert!(kinds.iter().any(|k| matches!(k, RoomEventKind::Moved { .. })));

    controller.stop_activity();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!controller.is_active());

    let settled = world.log.kinds_for(id).len();
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(world.log.kinds_for(id).len(), settled);
}

#[tokio::test(start_paused = true)]
async fn loop_error_ends_the_loop_for_good() {
    let world = world(BehaviorConfig::default(), RoomLayouts::standard());
    let controller = controller_at(&world, 100, 300, 350, Outfit::empty());
    controller.actions().leave_room();

    controller.begin_activity();
    tokio::time::sleep(Duration::from_secs(250)).await;
    assert!(!controller.is_active());

    let exit = controller.collect_exit().await;
    assert!(
        matches!(
            exit,
            Some(ActivityExit::Failed(BehaviorError::NotInRoom { bot })) if bot == controller.id()
        ),
        "unexpected exit: {exit:?}"
    );
    // Not restarted, nothing more to collect.
    tokio::time::sleep(Duration::from_secs(250)).await;
    assert!(!controller.is_active());
    assert!(controller.collect_exit().await.is_none());
    assert!(matches!(
        world.log.kinds_for(controller.id()).last(),
        Some(RoomEventKind::Left)
    ));
}

#[tokio::test(start_paused = true)]
async fn running_loop_has_no_exit_to_collect() {
    let world = world(BehaviorConfig::default(), RoomLayouts::standard());
    let controller = controller_at(&world, 100, 300, 350, Outfit::empty());

    controller.begin_activity();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(controller.collect_exit().await.is_none());
    assert!(controller.is_active());

    controller.stop_activity();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(controller.collect_exit().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn restarting_keeps_a_single_loop() {
    let world = world(BehaviorConfig::default(), RoomLayouts::standard());
    let controller = controller_at(&world, 100, 300, 350, Outfit::empty());

    controller.begin_activity();
    controller.begin_activity();
    assert!(controller.is_active());

    controller.handle_disconnect();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!controller.is_active());
    assert_eq!(controller.bot().room(), None);
    assert!(matches!(
        world.log.kinds_for(controller.id()).last(),
        Some(RoomEventKind::Left)
    ));
}

#[tokio::test(start_paused = true)]
async fn spot_visit_restores_clothes_and_spot() {
    let world = world(BehaviorConfig::default(), single_spot_layouts());
    let original = Outfit::from_items([(ClothingSlot::Head, 10)]);
    let controller = controller_at(&world, 1, 50, 50, original.clone());
    let pool = world.ctx.layouts.spots_for(RoomId(1));

    let mut visited = false;
    for _ in 0..500 {
        if controller.actions().move_to_spot().await.unwrap() {
            visited = true;
            break;
        }
    }
    assert!(visited);

    assert_eq!(controller.bot().outfit(), original);
    assert_eq!(pool.available(), 1);
    assert_eq!(controller.bot().position(), Position::new(200, 200));

    let kinds = world.log.kinds_for(controller.id());
    let outfit_changes = kinds
        .iter()
        .filter(|k| matches!(k, RoomEventKind::OutfitChanged { .. }))
        .count();
    assert_eq!(outfit_changes, 2);
    assert!(kinds.contains(&RoomEventKind::Frame { frame: 26 }));
}

#[tokio::test(start_paused = true)]
async fn occupied_spot_is_skipped() {
    let world = world(BehaviorConfig::default(), single_spot_layouts());
    player(&world, 1, 203, 198);
    let controller = controller_at(&world, 1, 50, 50, Outfit::empty());

    for _ in 0..200 {
        assert!(!controller.actions().move_to_spot().await.unwrap());
    }
    assert_eq!(world.ctx.layouts.spots_for(RoomId(1)).available(), 1);
}

#[tokio::test(start_paused = true)]
async fn stopping_mid_visit_releases_the_lease() {
    let config = BehaviorConfig {
        spot_dwell_secs: Span::new(600, 600),
        ..BehaviorConfig::default()
    };
    let world = world(config, single_spot_layouts());
    world.ctx.flags.set(Feature::RandomFrames, false);
    world.ctx.flags.set(Feature::RandomMovement, false);

    let original = Outfit::from_items([(ClothingSlot::Head, 10)]);
    let controller = controller_at(&world, 1, 50, 50, original.clone());
    let pool = world.ctx.layouts.spots_for(RoomId(1));

    controller.begin_activity();
    let mut held = false;
    for _ in 0..1_000 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        if pool.available() == 0 {
            held = true;
            break;
        }
    }
    assert!(held);

    controller.stop_activity();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(pool.available(), 1);
    assert_eq!(controller.bot().outfit(), original);
}

#[tokio::test(start_paused = true)]
async fn snowball_hit_triggers_a_reaction() {
    let world = world(BehaviorConfig::default(), RoomLayouts::standard());
    let controller = controller_at(&world, 100, 300, 300, Outfit::empty());
    let thrower = player(&world, 100, 400, 380);

    assert!(!controller.handle_snowball(&thrower, Position::new(340, 300)).await);
    assert!(controller.handle_snowball(&thrower, Position::new(310, 290)).await);

    let last = world.log.kinds_for(controller.id()).pop();
    assert!(
        last == Some(RoomEventKind::Emote { emote: emotes::SAD })
            || last
                == Some(RoomEventKind::Snowball {
                    target: Position::new(400, 380)
                })
    );
}

#[tokio::test(start_paused = true)]
async fn late_move_dispatch_trails_the_latest_position() {
    let world = world(BehaviorConfig::default(), RoomLayouts::standard());
    let controller = controller_at(&world, 100, 300, 300, Outfit::empty());
    let leader = player(&world, 100, 350, 300);
    controller
        .handle_safe_message(&leader, SafeMessage::FollowMe)
        .await
        .unwrap();
    assert_eq!(controller.bot().position(), Position::new(310, 300));

    // Two moves land in the directory before either dispatch runs.
    for position in [Position::new(350, 400), Position::new(500, 300)] {
        world.mirror.apply_world(&WorldEvent::PlayerMoved {
            player: leader.id,
            position,
        });
    }
    controller.on_player_moved(leader.id).await;
    controller.on_player_moved(leader.id).await;
    assert_eq!(controller.bot().position(), Position::new(460, 300));
}

#[tokio::test(start_paused = true)]
async fn follow_and_go_away() {
    let config = BehaviorConfig {
        bot_rooms: vec![RoomId(100), RoomId(200)],
        ..BehaviorConfig::default()
    };
    let world = world(config, RoomLayouts::standard());
    let controller = controller_at(&world, 100, 300, 300, Outfit::empty());
    let leader = player(&world, 100, 350, 300);

    controller
        .handle_safe_message(&leader, SafeMessage::FollowMe)
        .await
        .unwrap();
    assert_eq!(controller.bot().following(), Some(leader.id));
    assert_eq!(controller.bot().position(), Position::new(310, 300));

    world.mirror.apply_world(&WorldEvent::PlayerMoved {
        player: leader.id,
        position: Position::new(350, 400),
    });
    controller.on_player_moved(leader.id).await;
    assert_eq!(controller.bot().position(), Position::new(335, 362));

    let near = world.mirror.occupants(RoomId(100)).pop().unwrap();
    controller
        .handle_safe_message(&near, SafeMessage::GoAway)
        .await
        .unwrap();
    assert_eq!(controller.bot().following(), None);
    assert_eq!(controller.bot().room(), Some(RoomId(200)));

    let said: Vec<_> = world
        .log
        .kinds_for(controller.id())
        .into_iter()
        .filter_map(|k| match k {
            RoomEventKind::SafeMessage { message } => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(said, vec![SafeMessage::Ok, SafeMessage::SeeULater]);
}

#[tokio::test(start_paused = true)]
async fn far_away_safe_messages_are_ignored() {
    let world = world(BehaviorConfig::default(), RoomLayouts::standard());
    let controller = controller_at(&world, 100, 100, 100, Outfit::empty());
    let shouter = player(&world, 100, 400, 400);

    controller
        .handle_safe_message(&shouter, SafeMessage::Hello)
        .await
        .unwrap();
    let replied = world
        .log
        .kinds_for(controller.id())
        .into_iter()
        .any(|k| matches!(k, RoomEventKind::SafeMessage { .. }));
    assert!(!replied);
}

#[tokio::test(start_paused = true)]
async fn greets_players_joining_a_quiet_room() {
    let world = world(BehaviorConfig::default(), RoomLayouts::standard());
    let controller = controller_at(&world, 100, 100, 100, Outfit::empty());
    let newcomer = player(&world, 100, 200, 200);

    controller.on_player_joined_room(&newcomer);
    let greeted = world
        .log
        .kinds_for(controller.id())
        .into_iter()
        .any(|k| {
            matches!(
                k,
                RoomEventKind::SafeMessage {
                    message: SafeMessage::HiThere | SafeMessage::HowUDoing
                }
            )
        });
    assert!(greeted);

    world.log.drain();
    world.ctx.flags.toggle(Feature::Greeting);
    controller.on_player_joined_room(&newcomer);
    assert!(world.log.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn followers_chase_players_into_new_rooms() {
    let world = world(BehaviorConfig::default(), RoomLayouts::standard());
    let controller = controller_at(&world, 100, 300, 300, Outfit::empty());
    let mut leader = player(&world, 100, 320, 300);
    controller.actions().follow(&leader).await;

    leader.room = RoomId(330);
    leader.position = Position::new(500, 400);
    controller.on_player_joined_room(&leader);
    assert_eq!(controller.bot().room(), Some(RoomId(330)));
    assert_eq!(controller.bot().position(), Position::new(500, 400));
}

#[tokio::test(start_paused = true)]
async fn waddle_join_requires_the_player_to_stay_seated() {
    let world = world(BehaviorConfig::default(), RoomLayouts::standard());
    let controller = controller_at(&world, 230, 300, 300, Outfit::empty());
    let racer = player(&world, 230, 310, 300);
    let waddle = WaddleId(100);

    assert!(!controller.enter_waddle(racer.id, waddle).await);

    world.mirror.apply_world(&WorldEvent::WaddleJoined {
        player: racer.id,
        waddle,
        seats: 4,
    });
    assert!(controller.enter_waddle(racer.id, waddle).await);
    assert!(!controller.enter_waddle(racer.id, WaddleId(999)).await);

    // Seated, then back to the room it was wandering in.
    let kinds = world.log.kinds_for(controller.id());
    let seated = kinds
        .iter()
        .position(|k| *k == RoomEventKind::JoinedWaddle { waddle })
        .unwrap();
    assert!(matches!(
        kinds.get(seated + 1..).unwrap(),
        [RoomEventKind::Left, RoomEventKind::Joined { position }] if *position == Position::new(300, 300)
    ));
    assert_eq!(controller.bot().room(), Some(RoomId(230)));
}

#[tokio::test(start_paused = true)]
async fn waddle_seat_without_a_room_is_refused() {
    let world = world(BehaviorConfig::default(), RoomLayouts::standard());
    let controller = controller_at(&world, 230, 300, 300, Outfit::empty());
    let racer = player(&world, 230, 310, 300);
    world.mirror.apply_world(&WorldEvent::WaddleJoined {
        player: racer.id,
        waddle: WaddleId(101),
        seats: 2,
    });
    controller.actions().leave_room();

    assert!(!controller.enter_waddle(racer.id, WaddleId(101)).await);
    assert_eq!(controller.bot().room(), None);
}

#[test]
fn config_parses_from_yaml() {
    let yaml = "
snowball_margin: 30
frames: { min: 20, max: 22 }
bot_rooms: [100, 330]
room_weights: { 330: 3.5 }
features:
  greeting: false
";
    let config: BehaviorConfig = serde_yml::from_str(yaml).unwrap();
    assert_eq!(config.snowball_margin, 30);
    assert_eq!(config.frames, Span::new(20, 22));
    assert_eq!(config.bot_rooms, vec![RoomId(100), RoomId(330)]);
    assert!((config.room_weight(RoomId(330)) - 3.5).abs() < f64::EPSILON);
    assert!(!config.features.greeting);
    assert!(config.features.spot_locations);
    assert!((config.interaction_distance - 100.0).abs() < f64::EPSILON);
}
