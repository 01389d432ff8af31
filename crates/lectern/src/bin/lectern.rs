fn main() -> anyhow::Result<()> {
    let result = lectern::cli::run();

    // Images and styled text may still be buffered
    use std::io::{self, Write};
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();

    result
}
