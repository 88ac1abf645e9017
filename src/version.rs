//------------------------------------------

/// Expands to the package version, shared by every tool's `--version`.
#[macro_export]
macro_rules! tools_version {
    () => {
        env!("CARGO_PKG_VERSION")
    };
}

pub fn tools_version() -> &'static str {
    tools_version!()
}

//------------------------------------------
