//! codeb-hook: PreToolUse hook for Claude Code.
//!
//! Reads the hook JSON from stdin and prints a permission decision to stdout
//! for deny/ask. Prints nothing to allow. Always exits 0: the host reads the
//! verdict from the envelope, never from the exit status.

use std::io::Read;

fn main() {
    codeb_hook::logging::init();

    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        log::warn!("failed to read stdin: {e}");
        return;
    }

    if let Some(output) = codeb_hook::run_hook(&input) {
        println!("{output}");
    }
}
