fn main() {
    println!("cargo:rustc-link-arg=-Tlinkall.x");
    println!("cargo:rerun-if-env-changed=ATOM_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=ATOM_WIFI_PASSWORD");
}
