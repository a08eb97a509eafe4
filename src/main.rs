fn main() {
    #[cfg(feature = "cli")]
    rsdelta::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("rsdelta: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
