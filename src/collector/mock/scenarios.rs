//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` and `/sys` states of a small
//! Android-like system.

use super::filesystem::MockFs;

impl MockFs {
    /// Creates a typical system with a few processes.
    ///
    /// Includes: init (PID 1), kthreadd (PID 2, kernel thread), zygote
    /// (PID 600, root), system_server (PID 1000, system uid, adj -16) and an
    /// app (PID 2001) exposing only `oom_score_adj`.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:        3854000 kB
MemFree:          812000 kB
MemAvailable:    1900000 kB
Buffers:           41000 kB
Cached:          1048000 kB
SwapCached:        12000 kB
Active:          1400000 kB
Inactive:         900000 kB
Unevictable:        2048 kB
Mlocked:            2048 kB
SwapTotal:       1048572 kB
SwapFree:         900000 kB
Dirty:               120 kB
",
        );

        fs.add_file(
            "/proc/vmstat",
            "\
nr_free_pages 203000
pgpgin 123456
pgpgout 654321
pswpin 100
pswpout 200
pgfault 999999
pgmajfault 1234
pgsteal_kswapd 5000
oom_kill 0
",
        );

        // orig_data_size compr_data_size mem_used_total mem_limit mem_used_max same_pages pages_compacted
        fs.add_file(
            "/sys/block/zram0/mm_stat",
            "  4096000  1024000  1200000        0  1300000      120        7\n",
        );

        // init
        fs.add_process(
            1,
            "1 (init) S 0 1 1 0 -1 4194560 500 9000 20 40 100 200 0 0 20 0 1 0 1 10000000 512",
            "Name:\tinit\nPid:\t1\nPPid:\t0\nUid:\t0\t0\t0\t0\nVmRSS:\t    2048 kB\nVmSwap:\t       0 kB\n",
        );
        fs.add_oom_adj(1, -16);
        fs.add_thread(
            1,
            1,
            "1 (init) S 0 1 1 0 -1 4194560 500 9000 20 40 100 200 0 0 20 0 1 0 1",
        );

        // kthreadd
        fs.add_process(
            2,
            "2 (kthreadd) S 0 0 0 0 -1 2129984 0 0 0 0 0 10 0 0 20 0 1 0 1 0 0",
            "Name:\tkthreadd\nPid:\t2\nPPid:\t0\nUid:\t0\t0\t0\t0\n",
        );
        fs.add_oom_adj(2, 0);

        // zygote
        fs.add_process(
            600,
            "600 (main) S 1 600 0 0 -1 4194624 8000 0 80 0 500 300 0 0 20 0 4 0 300",
            "Name:\tmain\nPid:\t600\nPPid:\t1\nUid:\t0\t0\t0\t0\nVmRSS:\t   51200 kB\nVmSwap:\t       0 kB\n",
        );
        fs.add_oom_adj(600, -16);
        fs.add_thread(
            600,
            600,
            "600 (main) S 1 600 0 0 -1 4194624 8000 0 80 0 500 300 0 0 20 0 4 0 300",
        );

        // system_server
        fs.add_process(
            1000,
            "1000 (system_server) S 600 600 0 0 -1 4194624 3000 0 30 0 900 400 0 0 18 -2 2 0 900",
            "Name:\tsystem_server\nPid:\t1000\nPPid:\t600\nUid:\t1000\t1000\t1000\t1000\nVmRSS:\t  204800 kB\nVmSwap:\t   10240 kB\n",
        );
        fs.add_oom_adj(1000, -16);
        fs.add_thread(
            1000,
            1000,
            "1000 (system_server) S 600 600 0 0 -1 4194624 2000 0 20 0 600 200",
        );
        fs.add_thread(
            1000,
            1010,
            "1010 (Binder:1000_1) S 600 600 0 0 -1 4194624 1000 0 10 0 300 200",
        );

        // app, newer kernel without oom_adj
        fs.add_process(
            2001,
            "2001 (com.example.app) S 600 600 0 0 -1 4194624 700 0 7 0 50 20 0 0 20 0 1 0 5000",
            "Name:\tcom.example.app\nPid:\t2001\nPPid:\t600\nUid:\t10057\t10057\t10057\t10057\nVmRSS:\t   81920 kB\nVmSwap:\t    4096 kB\n",
        );
        fs.add_oom_score_adj(2001, 529);

        fs
    }

    /// Creates a system under memory pressure: little free memory, heavy
    /// swapping and a vendor `pgfmfault` counter.
    pub fn memory_pressure() -> Self {
        let mut fs = Self::typical_system();

        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:        3854000 kB
MemFree:           24000 kB
Cached:           180000 kB
SwapCached:        64000 kB
Mlocked:            2048 kB
SwapTotal:       1048572 kB
SwapFree:          16000 kB
",
        );
        fs.add_file(
            "/proc/vmstat",
            "\
pswpin 880000
pswpout 1460000
pgmajfault 91000
pgfmfault 45000
",
        );

        fs
    }
}
