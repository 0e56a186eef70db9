use crate::config::{load_settings, save_settings_atomic, Cli, Paths, Rules};
use crate::input::{collect_input_nonblocking, map_event, GameInput};
use crate::player::PlayerId;
use crate::profile::ProfileBook;
use crate::render::{draw_board, draw_hud, Hud, Terminal};
use crate::scores::{JsonScoreStore, ScoreBoard, ScoreStore};
use crate::session::{Cmd, Session};
use crate::theme::Palette;
use crate::world::{PlayerSetup, World};
use anyhow::Result;
use crossterm::style::Color;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

const FRAME: Duration = Duration::from_millis(33);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Restart,
    Quit,
}

/// Resolves each name to its profile, saving any that had to be created.
fn load_roster(names: &[String], profiles_path: &std::path::Path) -> Vec<PlayerSetup> {
    let mut book = ProfileBook::load(profiles_path);
    let mut created = false;
    let roster = names
        .iter()
        .enumerate()
        .map(|(slot, name)| {
            let (profile, new) = book.get_or_create(name, slot);
            created |= new;
            PlayerSetup {
                glyph: profile.glyph,
                style: profile.style(),
                name: profile.name,
            }
        })
        .collect();
    if created {
        if let Err(e) = book.save(profiles_path) {
            warn!("profile not saved: {e:#}");
        }
    }
    roster
}

fn round_seed(base: u64, round: u64) -> u64 {
    if base == 0 {
        0
    } else {
        base.wrapping_add(round).max(1)
    }
}

pub(crate) async fn run(cli: Cli, paths: Paths) -> Result<()> {
    let mut settings = load_settings(&paths.settings_path);
    let names = settings.apply_cli(&cli);
    let rules = Rules::default();
    let palette = Palette::default();
    let roster = load_roster(&names, &paths.profiles_path);

    let store: Arc<dyn ScoreStore> = Arc::new(JsonScoreStore::new(paths.scores_path.clone()));
    let mut scores = ScoreBoard::load(store.as_ref(), rules.max_high_scores);

    let mut term = Terminal::begin()?;
    let mut round = 0u64;
    let result = loop {
        let world = World::new(
            settings.map_width,
            settings.map_height,
            rules.clone(),
            palette,
            round_seed(settings.seed, round),
        )
        .with_roster(&roster);
        info!(round, players = roster.len(), "starting round");
        let session = Session::start(world, scores, Arc::clone(&store));

        let outcome = drive(&mut term, &session, roster.len()).await;
        match session.shutdown().await {
            Ok(board) => scores = board,
            Err(e) => break Err(e),
        }
        match outcome {
            Ok(Outcome::Restart) => round += 1,
            Ok(Outcome::Quit) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    term.end()?;
    if let Err(e) = save_settings_atomic(&paths.settings_path, &settings) {
        warn!("settings not saved: {e:#}");
    }
    result
}

/// Frame loop for one round: input in, snapshot out.
async fn drive(term: &mut Terminal, session: &Session, players: usize) -> Result<Outcome> {
    let mut frames = tokio::time::interval(FRAME);
    loop {
        frames.tick().await;
        term.resize_if_needed()?;

        for ev in collect_input_nonblocking(Duration::ZERO)? {
            match map_event(players, &ev) {
                Some(GameInput::Quit) => {
                    for slot in 0..players {
                        session.send(Cmd::Quit(PlayerId(slot))).await;
                    }
                    return Ok(Outcome::Quit);
                }
                Some(GameInput::Restart) => return Ok(Outcome::Restart),
                Some(GameInput::Pause) => {
                    session.toggle_pause();
                }
                Some(GameInput::Turn { slot, direction }) if slot < players => {
                    session
                        .send(Cmd::Turn {
                            player: PlayerId(slot),
                            direction,
                        })
                        .await;
                }
                Some(GameInput::Activate { slot }) if slot < players => {
                    session.send(Cmd::Activate(PlayerId(slot))).await;
                }
                _ => {}
            }
        }

        let snap = session.latest();
        term.cur.clear(Color::Black);
        draw_board(&mut term.cur, &snap);
        draw_hud(
            &mut term.cur,
            &snap,
            &Hud {
                paused: session.is_paused(),
                high_scores: &snap.high_scores,
            },
        );
        term.present()?;
    }
}
