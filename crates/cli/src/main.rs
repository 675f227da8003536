fn main() {
    if let Err(e) = vanced_cli::run() {
        eprintln!("{}", nu_ansi_term::Color::Red.bold().paint(format!("error: {e}")));
        std::process::exit(1);
    }
}
