//! redletters CLI binary.
//!
//! All logic lives in the library; main.rs only invokes `cli::run()`.

fn main() {
    if let Err(code) = redletters::cli::run() {
        std::process::exit(code.as_i32());
    }
}
