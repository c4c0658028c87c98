fn main() {
    quota_carousel_lib::run()
}
