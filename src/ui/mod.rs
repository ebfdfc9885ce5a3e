//! Terminal output for the CLI
//!
//! Uses `cliclack` for spinners and prompts in an interactive terminal and
//! falls back to plain bracketed lines in CI or when piped.
//!
//! # Example
//!
//! ```rust,ignore
//! use shellcache::ui::{self, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Prefetching core resources...");
//! spinner.stop("Installed 4 core resources");
//!
//! ui::step_warn_hint(&ctx, "Cache was reset", "Run: shellcache deploy");
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, outro_success, step_info, step_ok, step_ok_detail,
    step_warn_hint,
};
pub use progress::TaskSpinner;
pub use prompts::confirm;
pub use theme::init_theme;
