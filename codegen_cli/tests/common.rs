use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub fn codegen_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("codegen"));
	cmd.env("NO_COLOR", "1").env_remove("CODEGEN_LOG").env("CI", "1");
	cmd
}
