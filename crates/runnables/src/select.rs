//! Choosing a runnable

use crate::host::EditorHost;
use crate::Runnable;

/// Labels of test runnables start with this
pub const TEST_PREFIX: &str = "test ";

/// Ask the user to pick a runnable. An empty list shows no picker.
pub async fn pick_runnable<'a>(
    host: &dyn EditorHost,
    runnables: &'a [Runnable],
) -> Option<&'a Runnable> {
    if runnables.is_empty() {
        return None;
    }

    let labels: Vec<String> = runnables.iter().map(|r| r.label.clone()).collect();
    let index = host.pick("Select runnable", &labels).await?;
    runnables.get(index)
}

/// First runnable accepted by `predicate`
pub fn find_runnable<'a>(
    runnables: &'a [Runnable],
    predicate: impl Fn(&Runnable) -> bool,
) -> Option<&'a Runnable> {
    runnables.iter().find(|&r| predicate(r))
}

pub fn is_test(runnable: &Runnable) -> bool {
    runnable.label.starts_with(TEST_PREFIX)
}

pub fn first_test(runnables: &[Runnable]) -> Option<&Runnable> {
    find_runnable(runnables, is_test)
}
