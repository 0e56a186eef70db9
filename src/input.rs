use crate::entity::Direction;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Debug)]
pub(crate) struct InputEvent {
    pub(crate) key: KeyCode,
    pub(crate) mods: KeyModifiers,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum GameInput {
    Turn { slot: usize, direction: Direction },
    Activate { slot: usize },
    Pause,
    Restart,
    Quit,
}

pub(crate) fn collect_input_nonblocking(max_wait: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();
    let mut timeout = max_wait;
    while event::poll(timeout)? {
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                out.push(InputEvent {
                    key: k.code,
                    mods: k.modifiers,
                });
                if out.len() >= 32 {
                    break;
                }
            }
        }
        // drain whatever else is queued without waiting again
        timeout = Duration::ZERO;
    }
    Ok(out)
}

/// WASD and `f` drive the first player. Arrows and Enter drive the second,
/// or the first when playing alone.
pub(crate) fn map_event(players: usize, ev: &InputEvent) -> Option<GameInput> {
    if ev.mods.contains(KeyModifiers::CONTROL) && ev.key == KeyCode::Char('c') {
        return Some(GameInput::Quit);
    }
    let arrows = if players > 1 { 1 } else { 0 };
    let turn = |slot, direction| Some(GameInput::Turn { slot, direction });
    match ev.key {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Some(GameInput::Quit),
        KeyCode::F(1) | KeyCode::Char('r') | KeyCode::Char('R') => Some(GameInput::Restart),
        KeyCode::F(12) | KeyCode::Char('p') | KeyCode::Char('P') => Some(GameInput::Pause),

        KeyCode::Char('w') | KeyCode::Char('W') => turn(0, Direction::Up),
        KeyCode::Char('s') | KeyCode::Char('S') => turn(0, Direction::Down),
        KeyCode::Char('a') | KeyCode::Char('A') => turn(0, Direction::Left),
        KeyCode::Char('d') | KeyCode::Char('D') => turn(0, Direction::Right),
        KeyCode::Char('f') | KeyCode::Char('F') => Some(GameInput::Activate { slot: 0 }),

        KeyCode::Up => turn(arrows, Direction::Up),
        KeyCode::Down => turn(arrows, Direction::Down),
        KeyCode::Left => turn(arrows, Direction::Left),
        KeyCode::Right => turn(arrows, Direction::Right),
        KeyCode::Enter => Some(GameInput::Activate { slot: arrows }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> InputEvent {
        InputEvent {
            key: code,
            mods: KeyModifiers::NONE,
        }
    }

    #[test]
    fn arrows_follow_the_player_count() {
        assert_eq!(
            map_event(1, &key(KeyCode::Up)),
            Some(GameInput::Turn { slot: 0, direction: Direction::Up })
        );
        assert_eq!(
            map_event(2, &key(KeyCode::Up)),
            Some(GameInput::Turn { slot: 1, direction: Direction::Up })
        );
        assert_eq!(
            map_event(2, &key(KeyCode::Char('a'))),
            Some(GameInput::Turn { slot: 0, direction: Direction::Left })
        );
        assert_eq!(map_event(2, &key(KeyCode::Enter)), Some(GameInput::Activate { slot: 1 }));
    }

    #[test]
    fn session_keys() {
        assert_eq!(map_event(1, &key(KeyCode::F(12))), Some(GameInput::Pause));
        assert_eq!(map_event(1, &key(KeyCode::F(1))), Some(GameInput::Restart));
        assert_eq!(map_event(1, &key(KeyCode::Esc)), Some(GameInput::Quit));
        let ctrl_c = InputEvent {
            key: KeyCode::Char('c'),
            mods: KeyModifiers::CONTROL,
        };
        assert_eq!(map_event(1, &ctrl_c), Some(GameInput::Quit));
        assert_eq!(map_event(1, &key(KeyCode::Char('x'))), None);
    }
}
