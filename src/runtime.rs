//! Runtime abstraction layer for async operations
//!
//! Analysis fetches are spawned through [`AsyncSpawner`] so the engine does not
//! hard-wire one executor. The tokio spawner is installed by default when the
//! `tokio-runtime` feature is on; hosts can install their own with
//! [`init_runtime`] before the first spawn.

use crate::prelude::{Future, Pin};

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(
        &self,
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Box<dyn AsyncHandle>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Convenience function for spawning with type safety
pub fn spawn<F>(future: F) -> Box<dyn AsyncHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    runtime().spawn_boxed(Box::pin(future))
}

/// Default spawner implementations
pub mod spawners {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::*;
        use ::tokio::runtime::{Builder, Handle, Runtime};
        use ::tokio::task::JoinHandle;
        use once_cell::sync::OnceCell;

        /// Tokio-based async spawner.
        ///
        /// Spawns onto the caller's runtime when there is one. Callers outside
        /// any runtime (a plain UI thread) get a small background runtime
        /// owned by the crate.
        pub struct TokioSpawner;

        static BACKGROUND: OnceCell<Runtime> = OnceCell::new();

        fn background() -> Option<&'static Runtime> {
            BACKGROUND
                .get_or_try_init(|| {
                    Builder::new_multi_thread()
                        .worker_threads(2)
                        .thread_name("fieldmap-fetch")
                        .enable_all()
                        .build()
                })
                .map_err(|e| log::warn!("cannot start background runtime: {}", e))
                .ok()
        }

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(
                &self,
                future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
            ) -> Box<dyn AsyncHandle> {
                let handle = match Handle::try_current() {
                    Ok(current) => current.spawn(future),
                    Err(_) => match background() {
                        Some(runtime) => runtime.spawn(future),
                        None => return BlockingSpawner.spawn_boxed(future),
                    },
                };
                Box::new(TokioHandle(handle))
            }
        }

        struct TokioHandle(JoinHandle<()>);

        impl AsyncHandle for TokioHandle {
            fn is_finished(&self) -> bool {
                self.0.is_finished()
            }

            fn cancel(&self) {
                self.0.abort();
            }
        }
    }

    /// Drives each future to completion on the calling thread.
    ///
    /// Useful for hosts without an executor; the spawning call blocks until
    /// the fetch finishes.
    pub struct BlockingSpawner;

    impl AsyncSpawner for BlockingSpawner {
        fn spawn_boxed(
            &self,
            future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
        ) -> Box<dyn AsyncHandle> {
            futures::executor::block_on(future);
            Box::new(FinishedHandle)
        }
    }

    struct FinishedHandle;

    impl AsyncHandle for FinishedHandle {
        fn is_finished(&self) -> bool {
            true
        }

        fn cancel(&self) {}
    }
}

/// Unified async delay function that works across runtimes
pub async fn async_delay(duration: std::time::Duration) {
    #[cfg(feature = "tokio-runtime")]
    {
        ::tokio::time::sleep(duration).await;
    }

    #[cfg(not(feature = "tokio-runtime"))]
    {
        let start = std::time::Instant::now();
        while start.elapsed() < duration {
            std::hint::spin_loop();
        }
    }
}

/// Global runtime instance
static RUNTIME: std::sync::OnceLock<Box<dyn AsyncSpawner>> = std::sync::OnceLock::new();

/// Initialize the runtime with a specific spawner. Ignored once a spawner is set.
pub fn init_runtime(spawner: Box<dyn AsyncSpawner>) {
    if RUNTIME.set(spawner).is_err() {
        log::debug!("runtime already initialised, keeping the existing spawner");
    }
}

/// Get the global runtime spawner
pub fn runtime() -> &'static dyn AsyncSpawner {
    RUNTIME
        .get_or_init(|| {
            #[cfg(feature = "tokio-runtime")]
            {
                Box::new(spawners::tokio_impl::TokioSpawner)
            }

            #[cfg(not(feature = "tokio-runtime"))]
            {
                Box::new(spawners::BlockingSpawner)
            }
        })
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[cfg(feature = "tokio-runtime")]
    #[::tokio::test]
    async fn test_tokio_spawner() {
        let handle = spawn(async {
            ::tokio::time::sleep(::tokio::time::Duration::from_millis(10)).await;
        });

        assert!(!handle.is_finished());

        ::tokio::time::sleep(::tokio::time::Duration::from_millis(50)).await;
        assert!(handle.is_finished());
    }

    #[cfg(feature = "tokio-runtime")]
    #[test]
    fn test_tokio_spawner_outside_runtime() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let handle = spawn(async move {
            ::tokio::time::sleep(::tokio::time::Duration::from_millis(5)).await;
            flag.store(true, Ordering::SeqCst);
        });

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !handle.is_finished() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(handle.is_finished());
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_blocking_spawner_runs_to_completion() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let handle = spawners::BlockingSpawner.spawn_boxed(Box::pin(async move {
            flag.store(true, Ordering::SeqCst);
        }));
        assert!(handle.is_finished());
        assert!(ran.load(Ordering::SeqCst));
    }
}
