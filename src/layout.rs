//! Cursor addressing and the text placement rule used by `put_string`.
//!
//! Addressing follows the HD44780 20-column stride even though the target module is 16
//! columns wide, as most 16x2 and 16x4 modules share that memory map. Neither the column
//! nor the row is validated; values outside the visible area produce whatever address the
//! arithmetic gives, and the controller decides what happens with it.

use core::str::Chars;

/// Number of visible columns on the module. Text written from row 0 wraps to row 1 after
/// this many cells.
pub const DISPLAY_COLUMNS: u8 = 16;

const LCD_CMD_SETDDRAMADDR: u8 = 0x80; //  Used to set the DDRAM (Display Data RAM)

const ROW_0_BASE: u8 = LCD_CMD_SETDDRAMADDR;
const ROW_1_BASE: u8 = LCD_CMD_SETDDRAMADDR + 0x40;
const ROW_2_BASE: u8 = ROW_0_BASE + 0x14;
const ROW_3_BASE: u8 = ROW_1_BASE + 0x14;

/// Returns the "set DDRAM address" command byte for the cell at `column`, `row`.
/// Rows other than 1, 2 and 3 address row 0.
pub const fn compute_address(column: u8, row: u8) -> u8 {
    let base = match row {
        1 => ROW_1_BASE,
        2 => ROW_2_BASE,
        3 => ROW_3_BASE,
        _ => ROW_0_BASE,
    };
    base.wrapping_add(column)
}

/// One character of a laid out string.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct LayoutStep {
    /// Cursor command to send before the character, if the cursor must move.
    pub cursor: Option<u8>,
    /// Character code sent to the data register.
    pub byte: u8,
}

/// Iterator over the placement of a string written at a given cell.
///
/// The first character is always preceded by a cursor command. When the string starts on
/// row 0, the character that would land past the last visible column is moved to the start
/// of row 1 and the rest follow it. Strings starting on any other row are written as
/// continuous cells from the start position with no wrapping.
pub struct TextLayout<'a> {
    chars: Chars<'a>,
    index: usize,
    column: u8,
    row: u8,
    break_point: Option<usize>,
}

impl<'a> TextLayout<'a> {
    pub fn new(text: &'a str, column: u8, row: u8) -> Self {
        let break_point = if row == 0 {
            DISPLAY_COLUMNS.checked_sub(column).map(usize::from)
        } else {
            None
        };
        Self {
            chars: text.chars(),
            index: 0,
            column,
            row,
            break_point,
        }
    }
}

impl Iterator for TextLayout<'_> {
    type Item = LayoutStep;

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.chars.next()?;
        let cursor = if self.index == 0 {
            Some(compute_address(self.column, self.row))
        } else if self.break_point == Some(self.index) {
            Some(compute_address(0, 1))
        } else {
            None
        };
        self.index += 1;
        Some(LayoutStep {
            cursor,
            byte: c as u8,
        })
    }
}
