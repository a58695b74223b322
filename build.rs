fn main() {
    // Host builds (tests, simulation) have no ESP-IDF toolchain to point at.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
