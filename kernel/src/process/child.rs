//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 父子线程关系
//!
//! 进程层在调度核心之上实现 exec/wait/exit，需要三样东西：
//! - 子线程退出时把退出码交给父线程，并唤醒等待的父线程
//! - 子线程加载用户程序完成后通知父线程加载是否成功
//! - 父线程先于子线程退出时，子线程成为孤儿
//!
//! 记录保存在父线程中，子线程描述符回收后退出码仍然可读。

use alloc::vec::Vec;

use crate::errno::Errno;
use crate::process::task::Tid;
use crate::sched::Scheduler;
use crate::sync::semaphore::SemaId;

/// 子线程加载状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Pending,
    Loaded,
    Failed,
}

/// 父线程中的子线程记录
#[derive(Debug, Clone)]
pub struct ChildRecord {
    pub(crate) tid: Tid,
    /// 子线程退出时 up
    pub(crate) exit_sema: SemaId,
    /// 子线程加载完成时 up
    pub(crate) load_sema: SemaId,
    pub(crate) exit_status: Option<i32>,
    pub(crate) load: LoadStatus,
}

impl ChildRecord {
    pub(crate) fn new(tid: Tid, exit_sema: SemaId, load_sema: SemaId) -> Self {
        Self {
            tid,
            exit_sema,
            load_sema,
            exit_status: None,
            load: LoadStatus::Pending,
        }
    }

    pub fn tid(&self) -> Tid {
        self.tid
    }

    /// 子线程已退出时的退出码
    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status
    }

    pub fn load(&self) -> LoadStatus {
        self.load
    }
}

impl Scheduler {
    fn child_record(&self, child: Tid) -> Result<&ChildRecord, Errno> {
        let parent = self.get(self.current);
        match parent.children.iter().find(|r| r.tid == child) {
            Some(record) => Ok(record),
            None if self.threads.contains_key(&child) => Err(Errno::NoChild),
            None => Err(Errno::NoSuchProcess),
        }
    }

    fn record_in_parent(&mut self, parent: Tid, child: Tid) -> Option<&mut ChildRecord> {
        self.threads
            .get_mut(&parent)?
            .children
            .iter_mut()
            .find(|r| r.tid == child)
    }

    /// 删除父线程中的记录并释放其信号量
    pub(crate) fn forget_child(&mut self, parent: Tid, child: Tid) -> Option<ChildRecord> {
        let children = &mut self.threads.get_mut(&parent)?.children;
        let index = children.iter().position(|r| r.tid == child)?;
        let record = children.remove(index);
        self.sema_destroy(record.exit_sema);
        self.sema_destroy(record.load_sema);
        Some(record)
    }

    /// 设置当前线程的退出码
    pub fn set_exit_status(&mut self, status: i32) {
        self.current_mut().exit_status = status;
    }

    /// 线程退出时的通知：交出退出码、唤醒父线程、子线程成为孤儿
    pub(crate) fn notify_exit(&mut self, tid: Tid) {
        let thread = self.get(tid);
        let status = thread.exit_status;
        if let Some(parent) = thread.parent {
            if let Some(record) = self.record_in_parent(parent, tid) {
                record.exit_status = Some(status);
                let sema = record.exit_sema;
                self.sema_up(sema);
            }
        }

        let children: Vec<ChildRecord> = core::mem::take(&mut self.get_mut(tid).children);
        for record in children {
            if let Some(child) = self.threads.get_mut(&record.tid) {
                child.parent = None;
            }
            self.sema_destroy(record.exit_sema);
            self.sema_destroy(record.load_sema);
        }
    }

    /// 等待子线程退出要 down 的信号量
    pub fn child_exit_sema(&self, child: Tid) -> Result<SemaId, Errno> {
        self.child_record(child).map(|r| r.exit_sema)
    }

    /// 子线程已退出后取走退出码，记录随之删除
    ///
    /// 子线程尚未退出时返回 `Errno::TryAgain`。
    pub fn reap_child(&mut self, child: Tid) -> Result<i32, Errno> {
        let status = match self.child_record(child)?.exit_status {
            Some(status) => status,
            None => return Err(Errno::TryAgain),
        };
        let parent = self.current;
        self.forget_child(parent, child);
        Ok(status)
    }

    /// 当前线程通知父线程加载结果
    pub fn notify_loaded(&mut self, success: bool) {
        let tid = self.current;
        let Some(parent) = self.get(tid).parent else {
            return;
        };
        if let Some(record) = self.record_in_parent(parent, tid) {
            record.load = if success { LoadStatus::Loaded } else { LoadStatus::Failed };
            let sema = record.load_sema;
            self.sema_up(sema);
        }
    }

    /// 等待子线程加载完成要 down 的信号量
    pub fn child_load_sema(&self, child: Tid) -> Result<SemaId, Errno> {
        self.child_record(child).map(|r| r.load_sema)
    }

    pub fn child_load_status(&self, child: Tid) -> Result<LoadStatus, Errno> {
        self.child_record(child).map(|r| r.load)
    }
}
