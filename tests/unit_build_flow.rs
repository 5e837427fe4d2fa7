// tests/unit_build_flow.rs

use gogo_test_utils::builders::{ConfigFileBuilder, GadgetConfigBuilder, UnitConfigBuilder};
use gogo_test_utils::fake_grid::{FakeGrid, submitted_names};
use gogo_test_utils::{init_tracing, with_timeout};

use std::error::Error;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use gogo::cli::resolve_gadgets;
use gogo::config::{ConfigFile, ProjectSettings};
use gogo::errors::GogoError;
use gogo::fs::FileSystem;
use gogo::fs::mock::MockFileSystem;
use gogo::grid::GridJob;
use gogo::register_gadgets;
use gogo::schedule::{RunReport, Scheduler, SchedulerContext};
use gogo::vars::Vars;

type TestResult = Result<(), Box<dyn Error>>;

fn testbench() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_var("TEST", "smoke")
        .with_unit(
            "uvm",
            UnitConfigBuilder::new("vkits/uvm")
                .command("vlogan -work ${UNIT_LIB} ${UNIT_DIR}/uvm_pkg.sv")
                .build(),
        )
        .with_unit(
            "cn",
            UnitConfigBuilder::new("vkits/cn")
                .after("uvm")
                .exclude_dir("gen")
                .command("vlogan -work ${UNIT_LIB} -L ${DEP_DIRS} ${UNIT_DIR}/cn_pkg.sv")
                .build(),
        )
        .with_gadget(
            "simv",
            GadgetConfigBuilder::new("simulate")
                .command("./simv +UVM_TESTNAME=${TEST}")
                .log("sim/${TEST}.log")
                .build(),
        )
        .build()
}

fn sources() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/tb/vkits/uvm/uvm_pkg.sv", "package uvm_pkg; endpackage");
    fs.add_file("/tb/vkits/cn/cn_pkg.sv", "package cn_pkg; endpackage");
    fs
}

async fn run_once(
    fs: &MockFileSystem,
    failing: Option<(&str, i32)>,
) -> (Result<RunReport, GogoError>, Vec<String>, Vec<GridJob>) {
    let cfg = testbench();
    let selection = resolve_gadgets(&[]).unwrap();
    let mut ctx = SchedulerContext::new(
        Arc::new(fs.clone()),
        Vars::new(cfg.vars.clone()),
        ProjectSettings::from_section(&cfg.project, "/tb"),
    );
    register_gadgets(&mut ctx, &cfg, &selection, true).unwrap();

    let (tx, rx) = mpsc::channel(64);
    let submitted = Arc::new(Mutex::new(Vec::new()));
    let mut grid = FakeGrid::new(tx, Arc::clone(&submitted));
    if let Some((name, code)) = failing {
        grid = grid.with_exit_code(name, code);
    }
    let mut scheduler = Scheduler::new(grid, rx);
    let result = with_timeout(scheduler.run(&mut ctx, &selection.phases)).await;

    let names = submitted_names(&submitted);
    let jobs = submitted.lock().unwrap().clone();
    (result, names, jobs)
}

#[tokio::test]
async fn first_run_builds_units_in_dependency_order_and_flushes() -> TestResult {
    init_tracing();
    let fs = sources();

    let (result, names, jobs) = run_once(&fs, None).await;
    let report = result?;

    assert_eq!(names, vec!["uvm", "cn", "simv"]);
    // The expander and the flush never submit anything themselves.
    assert_eq!(report.dropped, vec!["build".to_string(), "flush".to_string()]);

    let cn = jobs.iter().find(|j| j.name == "cn").ok_or("cn was not submitted")?;
    assert_eq!(cn.cmd, "sh /tb/.gogo/.cn.sh");
    assert_eq!(cn.cwd.as_deref(), Some(Path::new("/tb/vkits/cn")));
    let simv = jobs.iter().find(|j| j.name == "simv").ok_or("simv was not submitted")?;
    assert_eq!(simv.log.as_deref(), Some(Path::new("/tb/sim/smoke.log")));

    assert!(fs.exists(Path::new("/tb/.gogo/done/uvm.done")));
    assert!(fs.exists(Path::new("/tb/.gogo/done/cn.done")));
    // Job scripts are turds.
    assert!(!fs.exists(Path::new("/tb/.gogo/.cn.sh")));
    assert!(!fs.exists(Path::new("/tb/.gogo/.simv.sh")));
    Ok(())
}

#[tokio::test]
async fn second_run_skips_fresh_units() -> TestResult {
    init_tracing();
    let fs = sources();
    run_once(&fs, None).await.0?;

    let (result, names, _) = run_once(&fs, None).await;
    let report = result?;
    assert_eq!(names, vec!["simv"]);
    assert_eq!(report.skipped, vec!["uvm".to_string(), "cn".to_string()]);
    Ok(())
}

#[tokio::test]
async fn touched_dependency_rebuilds_its_dependents() -> TestResult {
    init_tracing();
    let fs = sources();
    run_once(&fs, None).await.0?;

    fs.add_file("/tb/vkits/uvm/uvm_pkg.sv", "package uvm_pkg; int x; endpackage");
    let (result, names, _) = run_once(&fs, None).await;
    result?;
    assert_eq!(names, vec!["uvm", "cn", "simv"]);

    // Generated files are not sources.
    fs.add_file("/tb/vkits/cn/gen/regs.sv", "");
    let (result, names, _) = run_once(&fs, None).await;
    result?;
    assert_eq!(names, vec!["simv"]);
    Ok(())
}

#[tokio::test]
async fn failed_unit_removes_its_marker_and_stops_the_run() -> TestResult {
    init_tracing();
    let fs = sources();
    run_once(&fs, None).await.0?;
    fs.add_file("/tb/vkits/cn/cn_pkg.sv", "syntax error");

    let (result, names, _) = run_once(&fs, Some(("cn", 1))).await;
    let err = result.err().ok_or("expected the run to fail")?;
    assert_eq!(
        err.to_string(),
        "Gadget cn failed with exit status 1. See /tb/.gogo/logs/cn.log"
    );
    assert_eq!(names, vec!["cn"]);
    assert!(!fs.exists(Path::new("/tb/.gogo/done/cn.done")));
    assert!(fs.exists(Path::new("/tb/.gogo/done/uvm.done")));
    // No flush after a failure: the script stays for inspection.
    assert!(fs.exists(Path::new("/tb/.gogo/.cn.sh")));
    Ok(())
}
