//! アプリケーションセッション
//!
//! 設定、メニュー解決器、ドキュメント、UIスレッドの受け口をひとつにまとめる。
//! コア部品はすべてこのセッションを所有するスレッドから呼ばれ、
//! 他スレッドからの操作は [`UiHandle`] 経由で持ち込まれる。

use std::fs;
use std::path::{Path, PathBuf};

use crossterm::event::KeyEvent;

use crate::action::{builtin, ActionContext, ActionFactories, ActionRequest, CommandResult, SharedAction};
use crate::config::Config;
use crate::editor::{DocumentId, DocumentSet};
use crate::error::{ActionError, Result, ScribeError};
use crate::input::Accelerator;
use crate::menu::{
    ConfigChangeEvent, ConfigChangeListener, ConfigNotifier, MenuResolver, NodeKind, PopupKind,
    TargetKind,
};
use crate::ui::{PopupMenu, UiHandle, UiMailbox};

/// アプリケーションセッション
pub struct Session {
    /// 読み込んだ設定
    config: Config,
    /// メニュー/アクション解決器
    resolver: MenuResolver,
    /// 開いているドキュメント
    documents: DocumentSet,
    /// 設定変更の購読者（解決器以外）
    notifier: ConfigNotifier,
    /// 他スレッドからのタスク
    mailbox: UiMailbox<Session>,
    /// 実行中のアクションが出した依頼
    requests: Vec<ActionRequest>,
    /// セッション外へ渡す依頼（ツール実行など）
    outbox: Vec<ActionRequest>,
    /// 最近使ったファイル（新しい順）
    recent_files: Vec<PathBuf>,
    /// 直近のメッセージ
    message: Option<String>,
}

impl Session {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_factories(config, ActionFactories::new())
    }

    /// カスタムアクションのファクトリ表を指定して作成
    pub fn with_factories(config: Config, factories: ActionFactories) -> Result<Self> {
        config.validate()?;

        let mut resolver = MenuResolver::new(config.menu.clone())?
            .with_layout(config.layout.clone())
            .with_dynamic(config.dynamic.clone())
            .with_recent(config.recent.clone())
            .with_factories(factories);

        let report = resolver.build_all();
        log::info!(
            "{} action(s) registered, {} omitted",
            report.registered.len(),
            report.omitted.len()
        );
        resolver.patch_keybindings(&config.keybinding_change());
        resolver.load_menu_bar();

        let mut documents = DocumentSet::with_history_limit(config.history.limit);
        documents.bind_history_actions(
            history_action(&resolver, builtin::UNDO),
            history_action(&resolver, builtin::REDO),
        );

        Ok(Self {
            config,
            resolver,
            documents,
            notifier: ConfigNotifier::new(),
            mailbox: UiMailbox::new(),
            requests: Vec::new(),
            outbox: Vec::new(),
            recent_files: Vec::new(),
            message: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &MenuResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut MenuResolver {
        &mut self.resolver
    }

    pub fn documents(&self) -> &DocumentSet {
        &self.documents
    }

    pub fn documents_mut(&mut self) -> &mut DocumentSet {
        &mut self.documents
    }

    pub fn notifier_mut(&mut self) -> &mut ConfigNotifier {
        &mut self.notifier
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn recent_files(&self) -> &[PathBuf] {
        &self.recent_files
    }

    /// 他スレッドへ渡すハンドル
    pub fn ui_handle(&self) -> UiHandle<Session> {
        self.mailbox.handle()
    }

    /// ID を指定してアクションを実行する
    pub fn execute(&mut self, id: &str) -> Result<CommandResult> {
        let action = self
            .resolver
            .lookup(id)
            .ok_or_else(|| ActionError::NotRegistered { id: id.to_string() })?;

        if action.kind() == NodeKind::Radio && action.is_enabled() {
            self.resolver.select(id);
        }

        let result = {
            let mut ctx = ActionContext::new(&mut self.documents, &mut self.requests);
            action.perform(&mut ctx)?
        };
        self.process_requests()?;
        self.documents.flush_deferred();

        log::debug!("executed {} (success: {})", id, result.success);
        self.message = result.message.clone();
        Ok(result)
    }

    /// キー入力に割り当てられたアクションを実行する
    ///
    /// 割り当てがなければ `Ok(None)`。
    pub fn handle_key(&mut self, event: KeyEvent) -> Result<Option<CommandResult>> {
        let Ok(accelerator) = Accelerator::try_from(event) else {
            return Ok(None);
        };
        let Some(action) = self.resolver.find_by_accelerator(&accelerator) else {
            return Ok(None);
        };
        let id = action.id().to_string();
        self.execute(&id).map(Some)
    }

    /// 設定変更を解決器と購読者へ届ける
    pub fn apply_config_change(&mut self, event: &ConfigChangeEvent) {
        self.resolver.on_config_change(event);
        self.notifier.notify(event);
    }

    /// 空のドキュメントを開いてアクティブにする
    pub fn open_document(&mut self, title: impl Into<String>) -> DocumentId {
        let id = self.documents.open(title);
        self.documents.activate(id);
        id
    }

    /// ファイルを開いてアクティブにする（開いていればそれを使う）
    pub fn open_path(&mut self, path: &Path) -> Result<DocumentId> {
        if let Some(id) = self.documents.find_by_path(path) {
            self.documents.activate(id);
            return Ok(id);
        }

        let text = fs::read_to_string(path).map_err(|err| ScribeError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let id = self.documents.open_file(path, &text);
        self.documents.activate(id);
        self.note_recent_file(path)?;
        Ok(id)
    }

    /// 最近使ったファイルの先頭に加え、メニューを更新する
    pub fn note_recent_file(&mut self, path: &Path) -> Result<()> {
        self.recent_files.retain(|recent| recent != path);
        self.recent_files.insert(0, path.to_path_buf());
        self.recent_files.truncate(self.config.recent.max);
        self.resolver.update_recent_files(&self.recent_files)?;
        Ok(())
    }

    pub fn clear_recent_files(&mut self) -> Result<()> {
        self.recent_files.clear();
        self.resolver.update_recent_files(&[])?;
        Ok(())
    }

    pub fn set_document_title(&mut self, id: DocumentId, title: impl Into<String>) -> bool {
        match self.documents.get_mut(id) {
            Some(document) => {
                document.set_title(title);
                true
            }
            None => false,
        }
    }

    pub fn set_action_enabled(&mut self, id: &str, enabled: bool) -> bool {
        match self.resolver.lookup(id) {
            Some(action) => {
                action.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    pub fn popup(&mut self, kind: PopupKind) -> PopupMenu {
        self.resolver.popup(kind)
    }

    pub fn menu_outline(&self) -> String {
        self.resolver.menu_bar().outline()
    }

    /// セッション外で処理する依頼を取り出す
    pub fn take_requests(&mut self) -> Vec<ActionRequest> {
        std::mem::take(&mut self.outbox)
    }

    /// 他スレッドからのタスクと遅延タスクを実行し、実行数を返す
    pub fn pump(&mut self) -> usize {
        let tasks = self.mailbox.drain();
        let mut count = tasks.len();
        for task in tasks {
            task(self);
        }
        count += self.documents.flush_deferred();
        count
    }

    fn process_requests(&mut self) -> Result<()> {
        for request in std::mem::take(&mut self.requests) {
            match request {
                ActionRequest::OpenRecent(path) => {
                    self.open_path(&path)?;
                }
                ActionRequest::ClearRecentFiles => self.clear_recent_files()?,
                other => {
                    log::debug!("request forwarded: {:?}", other);
                    self.outbox.push(other);
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("actions", &self.resolver.registry().len())
            .field("documents", &self.documents.len())
            .field("recent_files", &self.recent_files.len())
            .finish()
    }
}

/// 組み込みの undo/redo ターゲットに結び付いたアクションを探す
fn history_action(resolver: &MenuResolver, target: &str) -> Option<SharedAction> {
    let mut found = None;
    resolver.tree().walk(&mut |node, _| {
        if found.is_none()
            && node.target_kind == TargetKind::Builtin
            && node.target.as_deref() == Some(target)
        {
            found = resolver.lookup(&node.id);
        }
    });
    found
}
