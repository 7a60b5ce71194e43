//! 测试辅助：可编排的假辅助程序执行器、进程启动互斥锁。
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, ZdpError};
use crate::helper::{Helper, HelperRunner};

/// 写可执行脚本与启动子进程的测试需串行执行，避免其他线程 fork 继承写句柄导致 ETXTBSY。
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

pub(crate) fn spawn_guard() -> MutexGuard<'static, ()> {
    SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// 写入一个 `/bin/sh` 脚本并赋予执行权限。
#[cfg(unix)]
pub(crate) fn write_script(path: &std::path::Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, format!("#!/bin/sh\n{body}\n"))
        .unwrap_or_else(|e| panic!("write {} failed: {e}", path.display()));
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .unwrap_or_else(|e| panic!("chmod {} failed: {e}", path.display()));
}

/// 假执行器的预置应答。
pub(crate) enum Reply {
    /// 正常退出并输出给定文本。
    Output(String),
    /// 非零退出，输出给定文本。
    Fail(String),
}

/// 按辅助程序预置应答并记录每次调用参数。
#[derive(Default)]
pub(crate) struct FakeRunner {
    replies: RefCell<HashMap<Helper, VecDeque<Reply>>>,
    calls: RefCell<Vec<(Helper, Vec<String>)>>,
}

impl FakeRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, helper: Helper, reply: Reply) -> Self {
        self.replies
            .borrow_mut()
            .entry(helper)
            .or_default()
            .push_back(reply);
        self
    }

    pub(crate) fn calls_to(&self, helper: Helper) -> Vec<Vec<String>> {
        self.calls
            .borrow()
            .iter()
            .filter(|(h, _)| *h == helper)
            .map(|(_, args)| args.clone())
            .collect()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl HelperRunner for FakeRunner {
    fn run(&self, helper: Helper, args: &[&str]) -> Result<String> {
        self.calls
            .borrow_mut()
            .push((helper, args.iter().map(|s| s.to_string()).collect()));
        let reply = self
            .replies
            .borrow_mut()
            .get_mut(&helper)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| panic!("unexpected call to {helper}"));
        match reply {
            Reply::Output(text) => Ok(text),
            Reply::Fail(output) => Err(ZdpError::HelperFailed {
                helper: helper.file_name().to_string(),
                reason: "exit status: 1".to_string(),
                output,
            }),
        }
    }
}
