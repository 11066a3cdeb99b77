//! Custom theme for cliclack output

use cliclack::ThemeState;
use console::Style;

/// gopt's theme: Go-gopher cyan bars, green on success
#[derive(Debug, Clone, Default)]
pub struct GoptTheme;

impl cliclack::Theme for GoptTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active | ThemeState::Submit => Style::new().cyan().dim(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().cyan(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().yellow(),
            ThemeState::Submit => Style::new().green(),
        }
    }
}

/// Install the theme; called once from `main`
pub fn init_theme() {
    cliclack::set_theme(GoptTheme);
}

#[cfg(test)]
mod tests {
    use super::*;
    use cliclack::Theme;

    #[test]
    fn error_state_is_red() {
        let theme = GoptTheme;
        let red = Style::new().red();
        assert_eq!(
            format!("{}", theme.bar_color(&ThemeState::Error(String::new())).apply_to("x")),
            format!("{}", red.apply_to("x"))
        );
    }
}
