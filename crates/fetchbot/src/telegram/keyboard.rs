//! Inline keyboard for the quality menu

use fetchcore::download::QualityMenu;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

pub fn quality_keyboard(menu: &QualityMenu) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = menu
        .buttons()
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(label, data)| InlineKeyboardButton::callback(label, data))
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keyboard_mirrors_menu_layout() {
        let menu = QualityMenu::new("abcdef012345", vec![1080, 720, 480]);
        let keyboard = quality_keyboard(&menu);

        let shape: Vec<usize> = keyboard.inline_keyboard.iter().map(Vec::len).collect();
        assert_eq!(shape, vec![2, 2, 1, 1]);

        match &keyboard.inline_keyboard[0][0].kind {
            InlineKeyboardButtonKind::CallbackData(data) => assert_eq!(data, "q|best|abcdef012345"),
            other => panic!("unexpected button {other:?}"),
        }
        assert_eq!(keyboard.inline_keyboard[3][0].text, "❌ Cancel");
    }
}
