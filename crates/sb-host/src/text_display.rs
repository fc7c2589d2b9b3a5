//! Display rendered as text: a status line over the piano roll.

use std::collections::BTreeMap;
use std::fmt::Write;

use sb_core::config::{DISPLAY_ROWS, DISPLAY_STEPS};
use sb_engine::{Display, Field};

/// Shown value of a field.
#[derive(Clone, Debug, PartialEq)]
enum Value {
    Number(i32),
    Label(String),
}

#[derive(Debug)]
pub struct TextDisplay {
    cells: [[bool; DISPLAY_ROWS]; DISPLAY_STEPS],
    playhead: Option<usize>,
    fields: BTreeMap<FieldKey, Value>,
    /// Calls received since the last [`TextDisplay::take_writes`]
    writes: usize,
}

/// `Field` ordered by its position on the status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct FieldKey(u8, u8);

impl From<Field> for FieldKey {
    fn from(field: Field) -> Self {
        let order = match field {
            Field::Bar => 0,
            Field::Beat => 1,
            Field::Step => 2,
            Field::Record => 3,
            Field::Bpm => 4,
            Field::Length => 5,
            Field::Track => 6,
            Field::TrackKind => 7,
            Field::Velocity => 8,
            Field::Quantize => 9,
            Field::RepeatDivision => 10,
            Field::ArpMode => 11,
            Field::ArpDivision => 12,
            Field::ArpOctaves => 13,
            Field::ArpGate => 14,
            Field::Zoom => 15,
            Field::Page => 16,
            Field::Param(i) => return FieldKey(17, i),
        };
        FieldKey(order, 0)
    }
}

impl Default for TextDisplay {
    fn default() -> Self {
        Self {
            cells: [[false; DISPLAY_ROWS]; DISPLAY_STEPS],
            playhead: None,
            fields: BTreeMap::new(),
            writes: 0,
        }
    }
}

impl TextDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(&self, col: usize, row: usize) -> bool {
        self.cells.get(col).and_then(|c| c.get(row)).copied().unwrap_or(false)
    }

    pub fn playhead(&self) -> Option<usize> {
        self.playhead
    }

    pub fn number(&self, field: Field) -> Option<i32> {
        match self.fields.get(&field.into()) {
            Some(Value::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn label(&self, field: Field) -> Option<&str> {
        match self.fields.get(&field.into()) {
            Some(Value::Label(s)) => Some(s),
            _ => None,
        }
    }

    /// Number of display calls since the last call.
    pub fn take_writes(&mut self) -> usize {
        std::mem::take(&mut self.writes)
    }

    /// Status line, then the grid with the highest note on top.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let status: Vec<String> = self
            .fields
            .values()
            .map(|v| match v {
                Value::Number(n) => n.to_string(),
                Value::Label(s) => s.clone(),
            })
            .collect();
        let _ = writeln!(out, "{}", status.join(" "));
        for row in (0..DISPLAY_ROWS).rev() {
            for col in 0..DISPLAY_STEPS {
                let c = match (self.cells[col][row], self.playhead == Some(col)) {
                    (true, _) => '#',
                    (false, true) => '|',
                    (false, false) => '.',
                };
                out.push(c);
            }
            out.push('\n');
        }
        out
    }
}

impl Display for TextDisplay {
    fn write_number(&mut self, field: Field, value: i32) {
        self.writes += 1;
        self.fields.insert(field.into(), Value::Number(value));
    }

    fn write_label(&mut self, field: Field, text: &str) {
        self.writes += 1;
        self.fields.insert(field.into(), Value::Label(text.to_owned()));
    }

    fn redraw_cell(&mut self, col: usize, row: usize, active: bool) {
        self.writes += 1;
        if let Some(cell) = self.cells.get_mut(col).and_then(|c| c.get_mut(row)) {
            *cell = active;
        }
    }

    fn draw_playhead_at(&mut self, column: Option<usize>) {
        self.writes += 1;
        self.playhead = column;
    }
}
