//! Command: print version information.

/// Print the myconfig version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    let version = option_env!("MYCONFIG_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    println!("myconfig {version}");
}
