//! A `harness = false` target driven by `run_main`.
//!
//! Accepts the runner's flags: `cargo test --test link_rig -- --verbose port`.

use std::sync::Arc;

use rig_runner::StaticTopology;
use rig_suite::{suite, SharedTopology};

struct Controller {
    ports: Vec<u16>,
}

#[derive(Default)]
struct LinkSuite {
    rig: Option<Arc<Controller>>,
    visited: Vec<u16>,
}

#[suite("Link Tests")]
impl LinkSuite {
    #[inject_topo("controller-3dut")]
    fn rig(&mut self, rig: Arc<Controller>) {
        self.rig = Some(rig);
    }

    #[after_each]
    fn forget(&mut self) {
        self.visited.clear();
    }

    #[test_case("every port is up", timeout = 1000)]
    fn ports_up(&mut self) -> Result<(), String> {
        let rig = self.rig.as_ref().ok_or("no rig")?;
        for &port in &rig.ports {
            self.visited.push(port);
        }
        if self.visited.len() == rig.ports.len() {
            Ok(())
        } else {
            Err(format!("visited {} of {} ports", self.visited.len(), rig.ports.len()))
        }
    }

    #[test_case("port list starts clean")]
    fn starts_clean(&mut self) -> Result<(), String> {
        if self.visited.is_empty() {
            Ok(())
        } else {
            Err(format!("{} ports left over", self.visited.len()))
        }
    }
}

#[derive(Default)]
struct PortSuite {
    numbering: Vec<u16>,
}

#[suite("Port Tests")]
impl PortSuite {
    #[before_all]
    fn number(&mut self) {
        self.numbering = (1..=3).collect();
    }

    #[test_case("ports are numbered from one")]
    fn numbering(&mut self) -> Result<(), &'static str> {
        match self.numbering.first() {
            Some(1) => Ok(()),
            _ => Err("numbering does not start at 1"),
        }
    }
}

fn main() {
    let controller = Arc::new(Controller { ports: vec![1, 2, 3] });
    let topology: SharedTopology =
        Arc::new(StaticTopology::new().with_resource("controller-3dut", controller));

    rig_runner::run_main(topology, |runner, topology| {
        rig_suite::generate_declared::<LinkSuite>(runner, topology)?;
        rig_suite::generate_declared::<PortSuite>(runner, topology)
    });
}
