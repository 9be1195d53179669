use std::process::ExitCode;

fn main() -> ExitCode {
    driver::main()
}
