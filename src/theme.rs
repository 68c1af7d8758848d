// Theme preference and the two bundled color palettes.
use crate::context::AppContext;
use crate::storage::LocalStorage;
use crate::store::StoreError;

/// A named color table handed to the view layer. Values are CSS-style hex
/// and rgba strings because that is what the shells consume directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub card_background: &'static str,
    pub text: &'static str,
    pub text_secondary: &'static str,
    pub primary: &'static str,
    pub primary_gradient: [&'static str; 2],
    pub secondary: &'static str,
    pub border: &'static str,
    pub danger: &'static str,
    pub success: &'static str,
    pub warning: &'static str,
    pub accent: &'static str,
    pub shadow: &'static str,
    pub overlay: &'static str,
}

pub const LIGHT: Palette = Palette {
    background: "#F8F9FA",
    card_background: "#FFFFFF",
    text: "#1A1A1A",
    text_secondary: "#6B7280",
    primary: "#6366F1",
    primary_gradient: ["#6366F1", "#8B5CF6"],
    secondary: "#10B981",
    border: "#E5E7EB",
    danger: "#EF4444",
    success: "#10B981",
    warning: "#F59E0B",
    accent: "#EC4899",
    shadow: "rgba(0, 0, 0, 0.08)",
    overlay: "rgba(0, 0, 0, 0.05)",
};

pub const DARK: Palette = Palette {
    background: "#0F172A",
    card_background: "#1E293B",
    text: "#F1F5F9",
    text_secondary: "#94A3B8",
    primary: "#818CF8",
    primary_gradient: ["#818CF8", "#A78BFA"],
    secondary: "#34D399",
    border: "#334155",
    danger: "#F87171",
    success: "#34D399",
    warning: "#FBBF24",
    accent: "#F472B6",
    shadow: "rgba(0, 0, 0, 0.3)",
    overlay: "rgba(0, 0, 0, 0.2)",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ThemeState {
    #[default]
    Loading,
    Ready {
        is_dark: bool,
    },
}

/// Dark-mode preference with a typed loading phase.
///
/// The flag and palette are unreadable (`None`) until `initialize` has
/// run; the view layer renders nothing in that window instead of
/// flashing the wrong theme.
#[derive(Debug, Clone, Default)]
pub struct ThemeController {
    state: ThemeState,
}

impl ThemeController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the persisted flag. Runs once when the provider starts.
    pub fn initialize(&mut self, ctx: &dyn AppContext) {
        let is_dark = LocalStorage::load_theme(ctx);
        self.state = ThemeState::Ready { is_dark };
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, ThemeState::Loading)
    }

    pub fn is_dark(&self) -> Option<bool> {
        match self.state {
            ThemeState::Loading => None,
            ThemeState::Ready { is_dark } => Some(is_dark),
        }
    }

    /// The palette for the current flag, `None` while still loading.
    pub fn palette(&self) -> Option<&'static Palette> {
        self.is_dark().map(|dark| if dark { &DARK } else { &LIGHT })
    }

    /// Flips dark mode and persists the new flag. The in-memory flip is
    /// kept even when the write fails; the failure is still reported so
    /// the shell can surface it.
    pub fn toggle(&mut self, ctx: &dyn AppContext) -> Result<bool, StoreError> {
        let ThemeState::Ready { is_dark } = self.state else {
            return Err(StoreError::NotReady);
        };
        let next = !is_dark;
        self.state = ThemeState::Ready { is_dark: next };
        match LocalStorage::save_theme(ctx, next) {
            Ok(()) => Ok(next),
            Err(e) => {
                log::warn!("Failed to persist theme flag: {}", e);
                Err(StoreError::Persist(e.to_string()))
            }
        }
    }
}
