pub(crate) mod async_task;
pub(crate) mod quota;
