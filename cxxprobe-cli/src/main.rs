fn main() -> anyhow::Result<()> {
    cxxprobe_cli::run()
}
