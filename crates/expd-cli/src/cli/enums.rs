use clap::ValueEnum;

/// How devices reach the development server
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum HostArg {
    /// Public tunnel, reachable from any network
    #[value(name = "tunnel", alias = "ngrok")]
    Tunnel,

    /// This machine's LAN address
    ///
    /// The device must be on the same network.
    #[value(name = "lan")]
    Lan,

    /// localhost, for simulators on this machine
    #[value(name = "localhost")]
    Localhost,
}
