fn main() -> std::process::ExitCode {
    circles_lib::run()
}
