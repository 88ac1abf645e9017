use anyhow::Result;

mod common;

use common::fixture::*;
use common::process::*;
use common::test_dir::*;
use common::thin::*;

use thinls::thin::metadata_generator::*;
use thinls::tools_version;

//------------------------------------------

fn table(stdout: &str) -> Vec<Vec<String>> {
    stdout
        .lines()
        .map(|l| l.split_whitespace().map(|s| s.to_string()).collect())
        .collect()
}

fn rows(expected: &[&[&str]]) -> Vec<Vec<String>> {
    expected
        .iter()
        .map(|r| r.iter().map(|s| s.to_string()).collect())
        .collect()
}

fn exit_code(output: &std::process::Output) -> Option<i32> {
    output.status.code()
}

//------------------------------------------
// command line

#[test]
fn accepts_help() -> Result<()> {
    let stdout = run_ok(thin_ls_path(), ["-h"])?;
    assert!(stdout.contains("List thin volumes within a pool"));
    assert!(stdout.contains("--metadata-snap"));
    assert!(stdout.contains("--no-headers"));
    assert!(stdout.contains("--format"));
    assert!(stdout.contains("comma separated list from"));
    assert!(stdout.contains("EXCLUSIVE_BLOCKS"));
    assert!(stdout.contains("SNAP_TIME"));
    Ok(())
}

#[test]
fn accepts_version() -> Result<()> {
    let stdout = run_ok(thin_ls_path(), ["-V"])?;
    assert!(stdout.contains(tools_version!()));
    Ok(())
}

#[test]
fn rejects_bad_option() -> Result<()> {
    let stderr = run_fail(thin_ls_path(), ["--hedgehogs-only"])?;
    assert!(stderr.contains("--hedgehogs-only"));
    Ok(())
}

#[test]
fn missing_input_arg() -> Result<()> {
    let output = run_fail_raw(thin_ls_path(), Vec::<&str>::new())?;
    assert_eq!(exit_code(&output), Some(exitcode::USAGE));
    assert!(std::str::from_utf8(&output.stderr)?.contains("No input file provided."));
    Ok(())
}

#[test]
fn input_file_not_found() -> Result<()> {
    let output = run_fail_raw(thin_ls_path(), ["no-such-file"])?;
    assert_eq!(exit_code(&output), Some(exitcode::USAGE));
    assert!(std::str::from_utf8(&output.stderr)?.contains("Couldn't find input file"));
    Ok(())
}

#[test]
fn input_cannot_be_a_directory() -> Result<()> {
    let td = TestDir::new()?;
    let output = run_fail_raw(thin_ls_path(), [td.path()])?;
    assert_eq!(exit_code(&output), Some(exitcode::USAGE));
    assert!(std::str::from_utf8(&output.stderr)?.contains("Not a block device or regular file"));
    Ok(())
}

#[test]
fn tiny_input_file() -> Result<()> {
    let mut td = TestDir::new()?;
    let md = mk_sized_file(&mut td, 1024)?;
    let output = run_fail_raw(thin_ls_path(), [&md])?;
    assert_eq!(exit_code(&output), Some(exitcode::USAGE));
    assert!(std::str::from_utf8(&output.stderr)?.contains("Metadata device/file too small"));
    Ok(())
}

#[test]
fn unknown_field_is_rejected_before_the_input_is_read() -> Result<()> {
    let output = run_fail_raw(thin_ls_path(), ["-o", "DEV,BOGUS", "no-such-file"])?;
    assert_eq!(exit_code(&output), Some(exitcode::USAGE));
    assert!(output.stdout.is_empty());
    assert!(std::str::from_utf8(&output.stderr)?.contains("unknown field 'BOGUS'"));
    Ok(())
}

#[test]
fn unknown_field_is_rejected_without_input() -> Result<()> {
    let stderr = run_fail(thin_ls_path(), ["--format", "BOGUS"])?;
    assert!(stderr.contains("unknown field 'BOGUS'"));
    Ok(())
}

//------------------------------------------
// listing

#[test]
fn default_fields() -> Result<()> {
    let mut td = TestDir::new()?;
    let (md, _) = mk_shared_pool(&mut td)?;

    let stdout = run_ok(thin_ls_path(), [&md])?;
    assert_eq!(
        table(&stdout),
        rows(&[
            &["DEV", "MAPPED", "CREATE_TIME", "SNAP_TIME"],
            &["1", "192KiB", "1", "0"],
            &["2", "192KiB", "2", "3"],
        ])
    );
    Ok(())
}

#[test]
fn exclusive_and_shared_blocks() -> Result<()> {
    let mut td = TestDir::new()?;
    let (md, _) = mk_shared_pool(&mut td)?;

    let stdout = run_ok(
        thin_ls_path(),
        [
            md.as_os_str(),
            "-o".as_ref(),
            "DEV,MAPPED_BLOCKS,EXCLUSIVE_BLOCKS,SHARED_BLOCKS".as_ref(),
        ],
    )?;
    assert_eq!(
        table(&stdout),
        rows(&[
            &["DEV", "MAPPED_BLOCKS", "EXCLUSIVE_BLOCKS", "SHARED_BLOCKS"],
            &["1", "3", "1", "2"],
            &["2", "3", "1", "2"],
        ])
    );
    Ok(())
}

#[test]
fn sectors_bytes_and_pretty_sizes() -> Result<()> {
    let mut td = TestDir::new()?;
    let (md, _) = mk_shared_pool(&mut td)?;

    let stdout = run_ok(
        thin_ls_path(),
        [
            md.as_os_str(),
            "--no-headers".as_ref(),
            "--format".as_ref(),
            "EXCLUSIVE_SECTORS,SHARED_BYTES,EXCLUSIVE,SHARED,TRANSACTION".as_ref(),
        ],
    )?;
    assert_eq!(
        table(&stdout),
        rows(&[
            &["128", "131072", "64KiB", "128KiB", "4"],
            &["128", "131072", "64KiB", "128KiB", "5"],
        ])
    );
    Ok(())
}

#[test]
fn no_headers_and_duplicate_fields() -> Result<()> {
    let mut td = TestDir::new()?;
    let (md, _) = mk_shared_pool(&mut td)?;

    let stdout = run_ok(
        thin_ls_path(),
        [
            md.as_os_str(),
            "--no-headers".as_ref(),
            "-o".as_ref(),
            "DEV,DEV,MAPPED_BLOCKS".as_ref(),
        ],
    )?;
    assert_eq!(table(&stdout), rows(&[&["1", "1", "3"], &["2", "2", "3"]]));
    Ok(())
}

#[test]
fn last_format_option_wins() -> Result<()> {
    let mut td = TestDir::new()?;
    let (md, _) = mk_shared_pool(&mut td)?;

    let stdout = run_ok(
        thin_ls_path(),
        [
            md.as_os_str(),
            "-o".as_ref(),
            "DEV".as_ref(),
            "-o".as_ref(),
            "MAPPED_BLOCKS".as_ref(),
        ],
    )?;
    assert_eq!(
        table(&stdout),
        rows(&[&["MAPPED_BLOCKS"], &["3"], &["3"]])
    );
    Ok(())
}

#[test]
fn empty_pool() -> Result<()> {
    let mut td = TestDir::new()?;
    let (md, _) = mk_pool(&mut td, &PoolSpec::new(128, vec![]))?;

    let stdout = run_ok(thin_ls_path(), [&md])?;
    assert_eq!(
        table(&stdout),
        rows(&[&["DEV", "MAPPED", "CREATE_TIME", "SNAP_TIME"]])
    );
    Ok(())
}

#[test]
fn repeated_runs_are_identical() -> Result<()> {
    let mut td = TestDir::new()?;
    let (md, _) = mk_shared_pool(&mut td)?;

    let args = [
        md.as_os_str(),
        "-o".as_ref(),
        "DEV,MAPPED,EXCLUSIVE,SHARED".as_ref(),
    ];
    let first = run_ok(thin_ls_path(), args)?;
    let second = run_ok(thin_ls_path(), args)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn input_is_untouched() -> Result<()> {
    let mut td = TestDir::new()?;
    let (md, _) = mk_shared_pool(&mut td)?;

    ensure_untouched(&md, || {
        run_ok(
            thin_ls_path(),
            [md.as_os_str(), "-o".as_ref(), "DEV,EXCLUSIVE".as_ref()],
        )?;
        Ok(())
    })
}

#[test]
fn runs_through_pdata_tools() -> Result<()> {
    let mut td = TestDir::new()?;
    let (md, _) = mk_shared_pool(&mut td)?;

    let direct = run_ok(thin_ls_path(), [&md])?;
    let multiplexed = run_ok(
        pdata_tools_path(),
        [std::ffi::OsStr::new("thin_ls"), md.as_os_str(), "--no-headers".as_ref()],
    )?;
    assert_eq!(table(&direct)[1..].to_vec(), table(&multiplexed));
    Ok(())
}

//------------------------------------------
// metadata snapshots

#[test]
fn reads_metadata_snapshot() -> Result<()> {
    let mut td = TestDir::new()?;
    let live = PoolSpec::new(
        128,
        vec![ThinDevice::new(1, &[1, 2, 3]), ThinDevice::new(2, &[2, 3, 4])],
    );
    let snap = PoolSpec::new(128, vec![ThinDevice::new(1, &[1, 2, 3])]);
    let (md, _) = mk_pool_with_snap(&mut td, &live, &snap)?;

    let stdout = run_ok(
        thin_ls_path(),
        [
            md.as_os_str(),
            "-m".as_ref(),
            "-o".as_ref(),
            "DEV,EXCLUSIVE_BLOCKS,SHARED_BLOCKS".as_ref(),
        ],
    )?;
    assert_eq!(
        table(&stdout),
        rows(&[&["DEV", "EXCLUSIVE_BLOCKS", "SHARED_BLOCKS"], &["1", "3", "0"]])
    );
    Ok(())
}

#[test]
fn metadata_snapshot_is_read_even_if_live_trees_are_damaged() -> Result<()> {
    let mut td = TestDir::new()?;
    let live = PoolSpec::new(128, vec![ThinDevice::new(1, &[1]), ThinDevice::new(2, &[1])]);
    let snap = PoolSpec::new(128, vec![ThinDevice::new(7, &[9])]);
    let (md, layout) = mk_pool_with_snap(&mut td, &live, &snap)?;
    trash_metadata_block(&md, layout.device_roots[&2])?;

    let stdout = run_ok(
        thin_ls_path(),
        [md.as_os_str(), "--metadata-snap".as_ref(), "-o".as_ref(), "DEV,SHARED".as_ref()],
    )?;
    assert_eq!(table(&stdout), rows(&[&["DEV", "SHARED"], &["7", "0"]]));

    let output = run_fail_raw(
        thin_ls_path(),
        [md.as_os_str(), "-o".as_ref(), "DEV,SHARED".as_ref()],
    )?;
    assert_eq!(exit_code(&output), Some(exitcode::DATAERR));
    Ok(())
}

#[test]
fn no_metadata_snapshot() -> Result<()> {
    let mut td = TestDir::new()?;
    let (md, _) = mk_shared_pool(&mut td)?;

    let output = run_fail_raw(thin_ls_path(), [md.as_os_str(), "-m".as_ref()])?;
    assert_eq!(exit_code(&output), Some(exitcode::IOERR));
    assert!(std::str::from_utf8(&output.stderr)?.contains("no current metadata snap"));
    Ok(())
}

//------------------------------------------
// damage

#[test]
fn zeroed_metadata() -> Result<()> {
    let mut td = TestDir::new()?;
    let md = mk_zeroed_md(&mut td)?;

    let output = run_fail_raw(thin_ls_path(), [&md])?;
    assert_eq!(exit_code(&output), Some(exitcode::IOERR));
    assert!(output.stdout.is_empty());
    assert!(std::str::from_utf8(&output.stderr)?.contains("bad checksum in superblock"));
    Ok(())
}

#[test]
fn damaged_superblock() -> Result<()> {
    let mut td = TestDir::new()?;
    let (md, _) = mk_shared_pool(&mut td)?;
    damage_superblock(&md)?;

    let stderr = run_fail(thin_ls_path(), [&md])?;
    assert!(stderr.contains("bad checksum in superblock"));
    Ok(())
}

#[test]
fn damaged_mapping_tree_produces_no_rows() -> Result<()> {
    let mut td = TestDir::new()?;
    let (md, layout) = mk_shared_pool(&mut td)?;
    trash_metadata_block(&md, layout.device_roots[&2])?;

    let output = run_fail_raw(
        thin_ls_path(),
        [md.as_os_str(), "-o".as_ref(), "DEV,EXCLUSIVE_BLOCKS".as_ref()],
    )?;
    assert_eq!(exit_code(&output), Some(exitcode::DATAERR));
    assert!(output.stdout.is_empty());
    assert!(std::str::from_utf8(&output.stderr)?
        .contains("metadata contains errors (run thin_check for details)."));

    // mapping trees aren't walked for the default fields
    let stdout = run_ok(thin_ls_path(), [&md])?;
    assert_eq!(table(&stdout).len(), 3);
    Ok(())
}

#[test]
fn damaged_device_tree_produces_no_rows() -> Result<()> {
    let mut td = TestDir::new()?;
    let (md, layout) = mk_shared_pool(&mut td)?;
    trash_metadata_block(&md, layout.details_root)?;

    let output = run_fail_raw(thin_ls_path(), [&md])?;
    assert_eq!(exit_code(&output), Some(exitcode::DATAERR));
    assert!(output.stdout.is_empty());
    Ok(())
}

#[test]
fn missing_mapping_root_produces_no_rows() -> Result<()> {
    let mut td = TestDir::new()?;
    let mut spec = PoolSpec::new(
        128,
        vec![ThinDevice::new(1, &[1, 2]), ThinDevice::new(2, &[3])],
    );
    spec.unindexed.insert(2);
    let (md, _) = mk_pool(&mut td, &spec)?;

    let output = run_fail_raw(
        thin_ls_path(),
        [md.as_os_str(), "-o".as_ref(), "DEV,SHARED_BLOCKS".as_ref()],
    )?;
    assert_eq!(exit_code(&output), Some(exitcode::DATAERR));
    assert!(output.stdout.is_empty());
    assert!(std::str::from_utf8(&output.stderr)?
        .contains("couldn't find mapping tree root for device 2"));
    Ok(())
}

#[test]
fn mapping_beyond_the_data_device_produces_no_rows() -> Result<()> {
    let mut td = TestDir::new()?;
    let mut spec = PoolSpec::new(
        128,
        vec![ThinDevice::new(1, &[1, 2]), ThinDevice::new(2, &[1 << 39])],
    );
    spec.nr_data_blocks = Some(1024);
    let (md, _) = mk_pool(&mut td, &spec)?;

    let output = run_fail_raw(
        thin_ls_path(),
        [md.as_os_str(), "-o".as_ref(), "DEV,EXCLUSIVE".as_ref()],
    )?;
    assert_eq!(exit_code(&output), Some(exitcode::DATAERR));
    assert!(output.stdout.is_empty());
    Ok(())
}

//------------------------------------------
