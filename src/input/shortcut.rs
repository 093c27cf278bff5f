use crate::editor::ToolKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutKey {
    Character(char),
    Enter,
    Escape,
    Delete,
    Backspace,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShortcutModifiers {
    pub command: bool,
    pub shift: bool,
}

impl ShortcutModifiers {
    pub const fn new(command: bool, shift: bool) -> Self {
        Self { command, shift }
    }

    pub const fn command() -> Self {
        Self::new(true, false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputContext {
    pub text_input_active: bool,
    pub prompt_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    TextInsertChar(char),
    TextInsertLineBreak,
    TextCommit,
    TextCancel,
    TextDeleteBackward,
    TextCursorLeft,
    TextCursorRight,
    TextCursorUp,
    TextCursorDown,
    PromptInsertChar(char),
    PromptDeleteBackward,
    PromptSend,
    PromptCancel,
    Undo,
    DeleteSelection,
    CopyImage,
    SaveImage,
    SelectTool(ToolKind),
    CloseRequested,
}

fn resolve_text_shortcut(
    key: ShortcutKey,
    modifiers: ShortcutModifiers,
) -> Option<ShortcutAction> {
    match (key, modifiers.command) {
        (ShortcutKey::Enter, true) => Some(ShortcutAction::TextCommit),
        // Undo while typing drops the whole edit.
        (ShortcutKey::Character(c), true) if c.eq_ignore_ascii_case(&'z') => {
            Some(ShortcutAction::TextCancel)
        }
        (ShortcutKey::Enter, false) => Some(ShortcutAction::TextInsertLineBreak),
        (ShortcutKey::Escape, _) => Some(ShortcutAction::TextCancel),
        (ShortcutKey::Backspace, _) | (ShortcutKey::Delete, _) => {
            Some(ShortcutAction::TextDeleteBackward)
        }
        (ShortcutKey::Left, _) => Some(ShortcutAction::TextCursorLeft),
        (ShortcutKey::Right, _) => Some(ShortcutAction::TextCursorRight),
        (ShortcutKey::Up, _) => Some(ShortcutAction::TextCursorUp),
        (ShortcutKey::Down, _) => Some(ShortcutAction::TextCursorDown),
        (ShortcutKey::Character(c), false) if !c.is_control() => {
            Some(ShortcutAction::TextInsertChar(c))
        }
        _ => None,
    }
}

fn resolve_prompt_shortcut(key: ShortcutKey) -> Option<ShortcutAction> {
    match key {
        ShortcutKey::Enter => Some(ShortcutAction::PromptSend),
        ShortcutKey::Escape => Some(ShortcutAction::PromptCancel),
        ShortcutKey::Backspace | ShortcutKey::Delete => Some(ShortcutAction::PromptDeleteBackward),
        ShortcutKey::Character(c) if !c.is_control() => Some(ShortcutAction::PromptInsertChar(c)),
        _ => None,
    }
}

fn resolve_overlay_shortcut(
    key: ShortcutKey,
    modifiers: ShortcutModifiers,
) -> Option<ShortcutAction> {
    match (key, modifiers.command, modifiers.shift) {
        (ShortcutKey::Character(c), true, false) => match c.to_ascii_lowercase() {
            'z' => Some(ShortcutAction::Undo),
            'c' => Some(ShortcutAction::CopyImage),
            's' => Some(ShortcutAction::SaveImage),
            _ => None,
        },
        (ShortcutKey::Delete, false, _) | (ShortcutKey::Backspace, false, _) => {
            Some(ShortcutAction::DeleteSelection)
        }
        (ShortcutKey::Escape, _, _) => Some(ShortcutAction::CloseRequested),
        (ShortcutKey::Character(c), false, false) => {
            ToolKind::from_shortcut(c).map(ShortcutAction::SelectTool)
        }
        _ => None,
    }
}

/// Text editing captures every key; the AI prompt captures unmodified keys only.
pub fn resolve_shortcut(
    key: ShortcutKey,
    modifiers: ShortcutModifiers,
    context: InputContext,
) -> Option<ShortcutAction> {
    if context.text_input_active {
        return resolve_text_shortcut(key, modifiers);
    }

    if context.prompt_active && !modifiers.command {
        return resolve_prompt_shortcut(key);
    }

    resolve_overlay_shortcut(key, modifiers)
}
