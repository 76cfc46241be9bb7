//! アクション表
//!
//! ノードID から生成済みアクションを引く。登録は先勝ちで、
//! 既に存在する ID への登録は無視される。

use std::collections::HashMap;

use crate::action::SharedAction;
use crate::input::Accelerator;

#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, SharedAction>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登録する。既に同じ ID があれば何もせず `false`
    pub fn register(&mut self, action: SharedAction) -> bool {
        if self.actions.contains_key(action.id()) {
            return false;
        }
        self.actions.insert(action.id().to_string(), action);
        true
    }

    pub fn lookup(&self, id: &str) -> Option<SharedAction> {
        self.actions.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.actions.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<SharedAction> {
        self.actions.remove(id)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// 登録済み ID（ソート済み）
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.actions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedAction> {
        self.actions.values()
    }

    /// アクセラレータが一致するアクションを探す
    ///
    /// 重複割り当てがある場合は ID の辞書順で最初のものを返す。
    pub fn find_by_accelerator(&self, accelerator: &Accelerator) -> Option<SharedAction> {
        self.actions
            .values()
            .filter(|action| action.accelerator().as_ref() == Some(accelerator))
            .min_by(|a, b| a.id().cmp(b.id()))
            .cloned()
    }
}
