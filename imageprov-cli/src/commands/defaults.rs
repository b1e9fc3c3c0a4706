use clap::Args;
use imageprov::OsType;

#[derive(Args, Debug)]
pub struct DefaultsArgs {
    /// Target OS type: linux, debian, ubuntu or windows
    #[arg(long, default_value = "linux")]
    pub os_type: OsType,
}

pub fn execute(args: DefaultsArgs) -> anyhow::Result<()> {
    let profile = args.os_type.profile();
    print!("{}", serde_yaml::to_string(&profile)?);
    Ok(())
}
