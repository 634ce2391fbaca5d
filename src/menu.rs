#![forbid(unsafe_code)]

use crate::model::{MenuCommand, MenuItem};

/// Operations offered for the object under the list cursor.
pub const MENU_ITEMS: &[MenuItem] = &[
    MenuItem { name: "download", shorthand: "w", detail: "download file.", command: MenuCommand::Download },
    MenuItem { name: "open", shorthand: "o", detail: "open file.", command: MenuCommand::Open },
    MenuItem { name: "edit", shorthand: "e", detail: "open editor by file.", command: MenuCommand::Edit },
    MenuItem { name: "detail", shorthand: "i", detail: "show object metadata.", command: MenuCommand::Detail },
];
