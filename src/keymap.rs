#![forbid(unsafe_code)]

//! Mode scoped key bindings.
//!
//! All modes share one table of `(modes, trigger, action)` rows so the
//! movement keys cannot drift apart between views.

use crate::model::{Action, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedKey {
    Esc,
    Enter,
    Up,
    Down,
    Left,
    Right,
    Ctrl(char),
}

/// A key press as seen by the resolver. Usually only one field is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputEvent {
    pub ch: Option<char>,
    pub key: Option<NamedKey>,
}

impl InputEvent {
    pub fn char(ch: char) -> Self {
        Self { ch: Some(ch), key: None }
    }

    pub fn key(key: NamedKey) -> Self {
        Self { ch: None, key: Some(key) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Char(char),
    Key(NamedKey),
}

#[derive(Debug)]
struct Binding {
    modes: &'static [Mode],
    trigger: Trigger,
    action: Action,
}

const ALL: &[Mode] = &[Mode::List, Mode::Menu, Mode::Detail, Mode::DownloadHistory];
const LIST: &[Mode] = &[Mode::List];
const MENU: &[Mode] = &[Mode::Menu];

const fn ch(modes: &'static [Mode], c: char, action: Action) -> Binding {
    Binding { modes, trigger: Trigger::Char(c), action }
}

const fn key(modes: &'static [Mode], k: NamedKey, action: Action) -> Binding {
    Binding { modes, trigger: Trigger::Key(k), action }
}

static BINDINGS: &[Binding] = &[
    // shared by every view
    ch(ALL, 'q', Action::Quit),
    ch(ALL, 'k', Action::Up),
    ch(ALL, 'j', Action::Down),
    key(ALL, NamedKey::Esc, Action::Quit),
    key(ALL, NamedKey::Up, Action::Up),
    key(ALL, NamedKey::Ctrl('p'), Action::Up),
    key(ALL, NamedKey::Down, Action::Down),
    key(ALL, NamedKey::Ctrl('n'), Action::Down),
    key(ALL, NamedKey::Ctrl('u'), Action::HalfUp),
    key(ALL, NamedKey::Ctrl('d'), Action::HalfDown),
    // list
    ch(LIST, 'h', Action::Ascend),
    ch(LIST, 'l', Action::Descend),
    ch(LIST, 'r', Action::Reload),
    ch(LIST, 'w', Action::Download),
    ch(LIST, 'o', Action::Open),
    ch(LIST, 'e', Action::Edit),
    ch(LIST, 'm', Action::OpenMenu),
    ch(LIST, 'n', Action::OpenDownloadHistory),
    ch(LIST, 'i', Action::OpenDetail),
    key(LIST, NamedKey::Left, Action::Ascend),
    key(LIST, NamedKey::Right, Action::Descend),
    key(LIST, NamedKey::Enter, Action::Descend),
    // menu
    ch(MENU, 'm', Action::Quit),
    key(MENU, NamedKey::Enter, Action::ExecuteMenuItem),
];

fn lookup(mode: Mode, trigger: Trigger) -> Option<Action> {
    BINDINGS
        .iter()
        .find(|binding| binding.trigger == trigger && binding.modes.contains(&mode))
        .map(|binding| binding.action)
}

/// Maps an input event to an action for `mode`. The character is looked up
/// first and the named key second, so a named key match wins when an event
/// carries both.
pub fn resolve(event: &InputEvent, mode: Mode) -> Option<Action> {
    let mut action = event.ch.and_then(|c| lookup(mode, Trigger::Char(c)));
    if let Some(named) = event.key.and_then(|k| lookup(mode, Trigger::Key(k))) {
        action = Some(named);
    }
    action
}
