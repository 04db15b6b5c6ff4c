/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Undo,
    Redo,
    Save,
    Delete,
    ClearSelection,
}

/// Maps a key press to an editor command. `key` is the DOM `KeyboardEvent.key`
/// value; `command` is Ctrl on most platforms and Cmd on macOS.
pub fn command_for(key: &str, command: bool, shift: bool, has_selection: bool) -> Option<Command> {
    if command {
        return match key.to_ascii_lowercase().as_str() {
            "z" if shift => Some(Command::Redo),
            "z" => Some(Command::Undo),
            "y" => Some(Command::Redo),
            "s" => Some(Command::Save),
            _ => None,
        };
    }
    match key {
        "Delete" | "Backspace" if has_selection => Some(Command::Delete),
        "Escape" if has_selection => Some(Command::ClearSelection),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_history_chords() {
        assert_eq!(command_for("z", true, false, false), Some(Command::Undo));
        assert_eq!(command_for("Z", true, true, false), Some(Command::Redo));
        assert_eq!(command_for("y", true, false, false), Some(Command::Redo));
        assert_eq!(command_for("s", true, false, true), Some(Command::Save));
        assert_eq!(command_for("z", false, false, true), None);
    }

    #[test]
    fn element_keys_need_a_selection() {
        assert_eq!(command_for("Delete", false, false, true), Some(Command::Delete));
        assert_eq!(command_for("Backspace", false, false, true), Some(Command::Delete));
        assert_eq!(command_for("Backspace", false, false, false), None);
        assert_eq!(command_for("Escape", false, false, true), Some(Command::ClearSelection));
    }
}
