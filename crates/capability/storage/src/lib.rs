//! # 状态存储层
//!
//! 设备登记与按（设备, 运转模式）键维护的状态快照的持久化抽象。
//!
//! ## 架构
//!
//! 1. **接口抽象层** (`traits.rs`)：`StatusStore` 异步 Trait
//! 2. **数据模型层** (`models.rs`)：`DeviceRecord`、`StatusSnapshotRecord`
//! 3. **错误处理层** (`error.rs`)：统一的 `StorageError`
//! 4. **连接管理层** (`connection.rs`)：Postgres 连接池
//! 5. **实现层**：
//!    - `in_memory`：`RwLock<HashMap>` 内存实现（测试与本地运行）
//!    - `postgres`：sqlx 实现（生产环境；`commit_applied` 在单事务内执行）
//!
//! ## 核心不变式
//!
//! - 每个（设备, 模式）至多一行快照；写入按状态自身的模式字段 upsert。
//! - `commit_applied` 原子地保存设备令牌与对应模式快照，失败不留半写。
//! - 并发控制不在本层：按设备串行化由对账引擎的锁注册表负责。

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod traits;

pub use connection::*;
pub use error::*;
pub use in_memory::InMemoryStatusStore;
pub use models::*;
pub use postgres::PgStatusStore;
pub use traits::*;
