fn main() -> anyhow::Result<()> {
    jelly_cli::run()
}
