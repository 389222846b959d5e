#[cfg(test)]
mod tests {
    use crate::cli::validation::{parse_api_url, parse_port};
    use crate::cli::{Cli, Command, HostArg};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_parse_api_url() {
        assert_eq!(
            parse_api_url("https://exp.host/"),
            Ok("https://exp.host".to_string())
        );
        assert_eq!(
            parse_api_url("http://localhost:3000"),
            Ok("http://localhost:3000".to_string())
        );
        assert!(parse_api_url("exp.host").is_err());
        assert!(parse_api_url("ftp://exp.host").is_err());
        assert!(parse_api_url("https://").is_err());
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("19000"), Ok(19000));
        assert!(parse_port("0").is_err());
        assert!(parse_port("70000").is_err());
        assert!(parse_port("abc").is_err());
    }

    #[test]
    fn test_host_enum_values() {
        use clap::ValueEnum;

        let hosts: Vec<_> = HostArg::value_variants()
            .iter()
            .map(|v| v.to_possible_value().unwrap().get_name().to_string())
            .collect();
        assert_eq!(hosts, vec!["tunnel", "lan", "localhost"]);
    }

    #[test]
    fn test_start_defaults() {
        let cli = Cli::try_parse_from(["expd", "start"]).unwrap();
        match cli.command {
            Command::Start(args) => {
                assert_eq!(args.project_root, PathBuf::from("."));
                assert!(args.port.is_none());
                assert!(args.packager_port.is_none());
                assert!(!args.reset_cache);
                assert!(args.host.is_none());
            }
            _ => panic!("Expected start command"),
        }
    }

    #[test]
    fn test_start_all_flags() {
        let cli = Cli::try_parse_from([
            "expd",
            "start",
            "app",
            "--port",
            "19000",
            "--packager-port",
            "19001",
            "--reset-cache",
            "--host",
            "ngrok",
            "--api-url",
            "http://localhost:3000/",
        ])
        .unwrap();
        match cli.command {
            Command::Start(args) => {
                assert_eq!(args.project_root, PathBuf::from("app"));
                assert_eq!(args.port, Some(19000));
                assert_eq!(args.packager_port, Some(19001));
                assert!(args.reset_cache);
                assert_eq!(args.host, Some(HostArg::Tunnel));
                assert_eq!(args.api_url.as_deref(), Some("http://localhost:3000"));
            }
            _ => panic!("Expected start command"),
        }
    }

    #[test]
    fn test_check_command() {
        let cli = Cli::try_parse_from(["expd", "check", "/tmp/app"]).unwrap();
        assert!(matches!(cli.command, Command::Check(ref args) if args.project_root == PathBuf::from("/tmp/app")));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["expd", "check", "--verbose", "--no-color"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.no_color);
        assert!(!cli.quiet);

        assert!(Cli::try_parse_from(["expd", "check", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_invalid_host_rejected() {
        assert!(Cli::try_parse_from(["expd", "start", "--host", "carrier-pigeon"]).is_err());
    }
}
