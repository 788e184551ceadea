fn main() {
    println!("cargo:rerun-if-env-changed=BSEC_LIB_DIR");

    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "espidf" {
        // libalgobsec.a ships per-target with the vendor's BSEC package.
        match std::env::var("BSEC_LIB_DIR") {
            Ok(dir) => {
                println!("cargo:rustc-link-search=native={dir}");
                println!("cargo:rustc-link-lib=static=algobsec");
            }
            Err(_) => println!("cargo:warning=BSEC_LIB_DIR not set; libalgobsec.a must be on the linker path"),
        }
    }

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
