//! appimage2rpm - convert AppImage bundles and application directories into RPMs.

use appimage2rpm::cli;
use appimage2rpm::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            // Fatal errors are shown even in quiet mode
            let output = OutputManager::new(false, false);
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                let _ = output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    let _ = output.indent(&suggestion);
                }
            }

            process::exit(1);
        }
    }
}
