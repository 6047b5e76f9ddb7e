use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Event family a finger produces.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Mouse,
    Touch,
    Pointer,
}

impl InputMode {
    /// Pointer type reported for fingers of this mode unless overridden.
    pub const fn default_pointer_kind(self) -> PointerKind {
        match self {
            InputMode::Mouse | InputMode::Pointer => PointerKind::Mouse,
            InputMode::Touch => PointerKind::Touch,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            InputMode::Mouse => "mouse",
            InputMode::Touch => "touch",
            InputMode::Pointer => "pointer",
        }
    }
}

impl Display for InputMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mouse" => Ok(InputMode::Mouse),
            "touch" => Ok(InputMode::Touch),
            "pointer" => Ok(InputMode::Pointer),
            other => Err(format!("unknown input mode '{other}' (expected mouse, touch or pointer)")),
        }
    }
}

/// `pointerType` tag carried by pointer events.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    #[default]
    Mouse,
    Pen,
    Touch,
}
