use std::sync::Arc;

use arc_swap::ArcSwap;

/// 실행 시점 스냅샷. 등록 순서를 그대로 유지합니다.
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// copy-on-write 방식의 순서 있는 등록소입니다.
///
/// 등록/해제는 새 벡터를 만들어 원자적으로 교체하므로, 이미 스냅샷을
/// 가져간 실행은 이후 변경을 보지 않습니다. 순회 중에는 어떤 잠금도
/// 잡지 않습니다.
pub struct Registry<T: ?Sized> {
    entries: ArcSwap<Vec<Arc<T>>>,
}

impl<T: ?Sized> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// 항목을 맨 뒤에 추가합니다. 같은 인스턴스가 이미 있으면 `false`입니다.
    pub fn register(&self, entry: Arc<T>) -> bool {
        self.register_unless(entry, |_| false)
    }

    /// `reject`가 참이 되는 기존 항목이 없을 때만 추가합니다.
    ///
    /// 동일 인스턴스(포인터 기준)는 항상 거부됩니다.
    pub fn register_unless<F>(&self, entry: Arc<T>, reject: F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        let mut inserted = false;
        self.entries.rcu(|current| {
            if current
                .iter()
                .any(|existing| Arc::ptr_eq(existing, &entry) || reject(&**existing))
            {
                inserted = false;
                return Arc::clone(current);
            }
            inserted = true;
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&entry));
            Arc::new(next)
        });
        inserted
    }

    /// 동일 인스턴스를 제거합니다. 없었다면 `false`입니다.
    pub fn unregister(&self, entry: &Arc<T>) -> bool {
        self.remove_where(|existing| Arc::ptr_eq(existing, entry))
    }

    /// 조건에 맞는 첫 항목을 제거합니다.
    pub fn remove_where<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Arc<T>) -> bool,
    {
        let mut removed = false;
        self.entries.rcu(|current| match current.iter().position(|e| predicate(e)) {
            Some(index) => {
                removed = true;
                let mut next: Vec<Arc<T>> = current.iter().cloned().collect();
                next.remove(index);
                Arc::new(next)
            }
            None => {
                removed = false;
                Arc::clone(current)
            }
        });
        removed
    }

    /// 전체 항목을 한 번에 교체합니다.
    pub fn replace(&self, entries: Vec<Arc<T>>) {
        self.entries.store(Arc::new(entries));
    }

    pub fn clear(&self) {
        self.replace(Vec::new());
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.entries.load_full()
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("len", &self.len()).finish()
    }
}
