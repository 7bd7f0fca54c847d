mod platform;

fn main() -> anyhow::Result<()> {
    platform::start()
}
