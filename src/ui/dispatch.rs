//! UIスレッド上のタスク配送
//!
//! コア部品はすべて UI を所有するスレッドからのみ呼ばれる。
//! * [`DeferredQueue`]: 現在のディスパッチ処理が終わった後に実行するタスク
//! * [`UiMailbox`] / [`UiHandle`]: 他スレッドから UI スレッドへ処理を持ち込む窓口

use std::collections::VecDeque;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::error::{Result, ScribeError};

/// 遅延実行タスク
pub type DeferredTask<C> = Box<dyn FnOnce(&mut C)>;

/// 遅延実行キュー（FIFO）
pub struct DeferredQueue<C> {
    tasks: VecDeque<DeferredTask<C>>,
}

impl<C> DeferredQueue<C> {
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    /// タスクを末尾に積む
    pub fn defer<F>(&mut self, task: F)
    where
        F: FnOnce(&mut C) + 'static,
    {
        self.tasks.push_back(Box::new(task));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// 積まれているタスクをすべて取り出す
    ///
    /// 実行中に積まれたタスクは次のサイクルに回る。
    pub fn take(&mut self) -> VecDeque<DeferredTask<C>> {
        std::mem::take(&mut self.tasks)
    }
}

impl<C> Default for DeferredQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for DeferredQueue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("pending", &self.tasks.len())
            .finish()
    }
}

/// 他スレッドから持ち込まれるタスク
pub type UiTask<C> = Box<dyn FnOnce(&mut C) + Send>;

/// UIスレッド側の受け口
pub struct UiMailbox<C> {
    sender: Sender<UiTask<C>>,
    receiver: Receiver<UiTask<C>>,
}

impl<C> UiMailbox<C> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    /// 他スレッドへ渡すハンドルを作成
    pub fn handle(&self) -> UiHandle<C> {
        UiHandle {
            sender: self.sender.clone(),
        }
    }

    /// 届いているタスクを取り出す（ブロックしない）
    pub fn drain(&self) -> Vec<UiTask<C>> {
        self.receiver.try_iter().collect()
    }
}

impl<C> Default for UiMailbox<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for UiMailbox<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiMailbox").finish_non_exhaustive()
    }
}

/// 他スレッドから UI スレッドへ処理を依頼するハンドル
pub struct UiHandle<C> {
    sender: Sender<UiTask<C>>,
}

impl<C> Clone for UiHandle<C> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<C> UiHandle<C> {
    /// 次のポンプで実行されるよう依頼する（待たない）
    pub fn invoke_later<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        self.sender
            .send(Box::new(task))
            .map_err(|_| ScribeError::Ui("UI mailbox closed".to_string()))
    }

    /// UIスレッドで実行し、完了まで呼び出し元スレッドをブロックする
    ///
    /// UIスレッド自身から呼ぶとポンプされないため戻らない。
    pub fn invoke_and_wait<F, R>(&self, task: F) -> Result<R>
    where
        F: FnOnce(&mut C) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, response) = mpsc::channel();
        self.invoke_later(move |context| {
            let _ = reply.send(task(context));
        })?;
        response
            .recv()
            .map_err(|_| ScribeError::Ui("UI task dropped before completion".to_string()))
    }
}
