pub const APP_NAME: &str = "sebs";

/// Name of the per-benchmark file, both in the benchmark tree and in the cache.
pub const CONFIG_FILENAME: &str = "config.json";

/// Script a benchmark ships to inject input or template data into a package.
pub const INIT_SCRIPT: &str = "init.sh";

/// Docker repository hosting the builder images.
pub const DEFAULT_DOCKER_REPOSITORY: &str = "spcleth/serverless-benchmarks";

/// Mount point of the staged package inside a builder container.
pub const CONTAINER_MOUNT_DIR: &str = "/mnt/function";

/// Entrypoint run by every builder image.
pub const INSTALLER_SCRIPT: &str = "/sebs/installer.sh";
