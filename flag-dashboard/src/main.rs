use flag_dashboard::cmd;

fn main() {
    if let Err(e) = cmd::Cli::run() {
        eprintln!("Oops! {e}");

        let mut source = e.source();
        if source.is_some() {
            eprintln!("\nCaused by:");
            let mut index = 0;
            while let Some(err) = source {
                eprintln!("    {index}: {err}");
                source = err.source();
                index += 1;
            }
        }
        std::process::exit(1);
    }
}
