//! Terminal output for gopt commands
//!
//! Uses `cliclack` for framed output on interactive terminals and falls back
//! to plain tagged lines in CI and when output is piped.
//!
//! ```rust,ignore
//! use gopt::ui::{self, UiContext};
//!
//! let ctx = UiContext::detect();
//! ui::intro(&ctx, "Installing into ~/go/bin");
//! ui::step_ok_detail(&ctx, "golang.org/x/tools/gopls", "~/go/bin/gopls");
//! ui::outro_success(&ctx, "1 installed");
//! ```

mod context;
mod output;
mod theme;

pub use context::UiContext;
pub use output::{
    field, intro, key_value, key_value_status, outro_success, outro_warn, remark, section,
    step_error_detail, step_info, step_ok, step_ok_detail, step_warn, step_warn_hint,
};
pub use theme::{init_theme, GoptTheme};
