//! Renders typed commands to shell-executable text. This is the only module
//! that composes docker, `tc`, and `bitcoin-cli` invocations; everything
//! upstream works with [`Command`] values.

use crate::cluster::paths::GUEST_DATA_DIR;
use crate::plan::command::{CliCall, Command, DaemonSpec, NodeRole};

/// Container name of the introductory node every peer dials first.
pub const BOOTSTRAP_CONTAINER: &str = "bootstrap";

/// Renders one command to a single shell line.
pub fn render(command: &Command) -> String {
    match command {
        Command::CreateNetwork { name, subnet } => {
            format!("docker network create --subnet={subnet} --driver bridge {name}")
        }
        Command::RemoveNetwork { name } => format!("docker network rm {name}"),
        Command::StartBootstrap {
            network,
            ip,
            image,
            daemon,
        } => format!(
            "docker run --cap-add=NET_ADMIN --detach=true --net={network} --ip={ip} \
             --name={BOOTSTRAP_CONTAINER} {image} bash -c \"{}\"",
            daemon_invocation(daemon)
        ),
        Command::StartNode {
            id,
            network,
            image,
            host_dir,
            daemon,
        } => format!(
            "docker run --cap-add=NET_ADMIN --detach=true --net={network} --name={id} \
             --hostname={id} --volume {}:{GUEST_DATA_DIR} {image} bash -c \"{}\"",
            host_dir.display(),
            daemon_invocation(daemon)
        ),
        Command::StopNode { id } => format!("docker rm --force {id}"),
        Command::Cli { node, call } => format!(
            "docker exec {node} /bin/sh -c '{} {}'",
            cli_prefix(),
            cli_invocation(call)
        ),
        Command::TickMarker { tick } => format!("echo '[tick {tick}]'"),
        Command::Settle { duration } => format!("sleep {}", duration.as_secs_f64()),
        Command::FixPermissions { host_root, image } => format!(
            "docker run --rm --volume {}:/mnt {image} chmod a+rwx --recursive /mnt",
            host_root.display()
        ),
    }
}

fn cli_prefix() -> String {
    format!("bitcoin-cli -regtest -datadir={GUEST_DATA_DIR}")
}

fn cli_invocation(call: &CliCall) -> String {
    match call {
        CliCall::Generate { blocks } => format!("generate {blocks}"),
        CliCall::SendToSelf { amount } => {
            format!("sendtoaddress $({} getnewaddress) {amount}", cli_prefix())
        }
        CliCall::CaptureChainTips => {
            format!("getchaintips > {GUEST_DATA_DIR}/chaintips.json")
        }
        CliCall::GetPeerInfo => "getpeerinfo".to_owned(),
    }
}

fn daemon_invocation(daemon: &DaemonSpec) -> String {
    let mut flags = vec![
        "-regtest".to_owned(),
        format!("-datadir={GUEST_DATA_DIR}"),
        "-debug".to_owned(),
        "-logips".to_owned(),
        "-logtimemicros".to_owned(),
        "-listen".to_owned(),
        "-listenonion=0".to_owned(),
        "-onlynet=ipv4".to_owned(),
        "-dnsseed=0".to_owned(),
    ];
    if daemon.role == NodeRole::Peer {
        flags.push(format!("-addnode={}", daemon.bootstrap_ip));
        flags.push(format!("-seednode={}", daemon.seed_ip));
        flags.push("-keypool=1".to_owned());
    }

    let bitcoind = format!("bitcoind {}", flags.join(" "));
    match daemon.latency {
        Some(delay) => format!(
            "tc qdisc replace dev eth0 root netem delay {}ms; {bitcoind}",
            delay.as_millis()
        ),
        None => bitcoind,
    }
}
